//! IMAP (raw protocol over rustls or plain TCP) plus SMTP via lettre.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use mail_parser::MessageParser;
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use super::MailTransport;
use crate::config::MailConfig;
use crate::error::MailError;
use crate::pipeline::types::InboundEmail;

/// Socket read/write bound for IMAP and SMTP.
const SOCKET_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything the IMAP session can talk through.
trait Stream: Read + Write + Send {}
impl<T: Read + Write + Send> Stream for T {}

/// One tagged command's reply.
struct Response {
    lines: Vec<String>,
    literals: Vec<Vec<u8>>,
    ok: bool,
}

/// A logged-in IMAP connection.
struct ImapSession {
    reader: BufReader<Box<dyn Stream>>,
    next_tag: u32,
}

impl ImapSession {
    fn new(stream: Box<dyn Stream>) -> Self {
        Self {
            reader: BufReader::new(stream),
            next_tag: 1,
        }
    }

    fn read_line(&mut self) -> Result<String, MailError> {
        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Err(MailError::Protocol("IMAP connection closed".into()));
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Send `cmd` and collect everything up to its tagged completion.
    fn command(&mut self, cmd: &str) -> Result<Response, MailError> {
        let tag = format!("A{}", self.next_tag);
        self.next_tag += 1;

        let stream = self.reader.get_mut();
        stream.write_all(format!("{tag} {cmd}\r\n").as_bytes())?;
        stream.flush()?;

        let done_prefix = format!("{tag} ");
        let mut lines = Vec::new();
        let mut literals = Vec::new();
        loop {
            let line = self.read_line()?;
            if let Some(len) = literal_len(&line) {
                let mut literal = vec![0u8; len];
                self.reader.read_exact(&mut literal)?;
                literals.push(literal);
            }
            if let Some(status) = line.strip_prefix(&done_prefix) {
                let ok = status.starts_with("OK");
                lines.push(line);
                return Ok(Response {
                    lines,
                    literals,
                    ok,
                });
            }
            lines.push(line);
        }
    }
}

/// Byte count of a trailing `{N}` literal marker.
fn literal_len(line: &str) -> Option<usize> {
    let line = line.trim_end_matches(['\r', '\n']);
    let open = line.rfind('{')?;
    line[open + 1..].strip_suffix('}')?.parse().ok()
}

/// Message numbers from `* SEARCH` lines.
fn parse_search(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|l| l.strip_prefix("* SEARCH"))
        .flat_map(|rest| rest.split_whitespace().map(str::to_string))
        .collect()
}

/// IMAP quoted string.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Strip HTML tags from content (basic).
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build an [`InboundEmail`] from raw RFC 822 bytes.
pub fn parse_message(id: &str, raw: &[u8]) -> Option<InboundEmail> {
    let parsed = MessageParser::default().parse(raw)?;

    let from = parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .unwrap_or("unknown")
        .to_string();
    let subject = parsed.subject().unwrap_or("(no subject)").to_string();
    let body = match (parsed.body_text(0), parsed.body_html(0)) {
        (Some(text), _) => text.into_owned(),
        (None, Some(html)) => strip_html(&html),
        (None, None) => String::new(),
    };
    let date = parsed.date().map(|d| d.to_rfc3339()).unwrap_or_default();

    Some(InboundEmail::new(id, from, subject, &body, date))
}

/// Mailbox transport backed by an IMAP inbox and an SMTP relay.
pub struct ImapSmtpTransport {
    config: MailConfig,
    session: Option<ImapSession>,
}

impl ImapSmtpTransport {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    fn open_stream(&self) -> Result<Box<dyn Stream>, MailError> {
        let host = self.config.imap_host.as_str();
        let port = self.config.imap_port;
        let connect_err = |reason: String| MailError::Connect {
            host: host.to_string(),
            port,
            reason,
        };

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| connect_err(e.to_string()))?
            .next()
            .ok_or_else(|| connect_err("no address resolved".into()))?;
        let tcp = TcpStream::connect_timeout(&addr, SOCKET_TIMEOUT)
            .map_err(|e| connect_err(e.to_string()))?;
        tcp.set_read_timeout(Some(SOCKET_TIMEOUT))?;
        tcp.set_write_timeout(Some(SOCKET_TIMEOUT))?;

        if !self.config.imap_use_ssl {
            return Ok(Box::new(tcp));
        }

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );
        let server_name = rustls_pki_types::ServerName::try_from(host.to_string())
            .map_err(|e| connect_err(e.to_string()))?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)
            .map_err(|e| connect_err(e.to_string()))?;
        Ok(Box::new(rustls::StreamOwned::new(conn, tcp)))
    }

    fn login(&mut self, stream: Box<dyn Stream>) -> Result<(), MailError> {
        let mut session = ImapSession::new(stream);
        let greeting = session.read_line()?;
        if !greeting.starts_with("* OK") && !greeting.starts_with("* PREAUTH") {
            return Err(MailError::Protocol(format!(
                "unexpected greeting: {}",
                greeting.trim_end()
            )));
        }

        let resp = session.command(&format!(
            "LOGIN {} {}",
            quote(&self.config.address),
            quote(self.config.password.expose_secret())
        ))?;
        if !resp.ok {
            return Err(MailError::Login {
                user: self.config.address.clone(),
                reason: resp.lines.last().map(|l| l.trim_end().to_string()).unwrap_or_default(),
            });
        }

        self.session = Some(session);
        Ok(())
    }

    fn session(&mut self) -> Result<&mut ImapSession, MailError> {
        self.session.as_mut().ok_or(MailError::NotConnected)
    }

    /// Reply-capable SMTP transport for the configured relay.
    fn smtp(&self) -> Result<SmtpTransport, MailError> {
        let host = self.config.smtp_host.as_str();
        let port = self.config.smtp_port;
        let builder = if !self.config.smtp_use_tls {
            SmtpTransport::builder_dangerous(host)
        } else if port == 465 {
            SmtpTransport::relay(host).map_err(|e| MailError::Connect {
                host: host.to_string(),
                port,
                reason: format!("SMTP relay error: {e}"),
            })?
        } else {
            SmtpTransport::starttls_relay(host).map_err(|e| MailError::Connect {
                host: host.to_string(),
                port,
                reason: format!("SMTP relay error: {e}"),
            })?
        };

        let creds = Credentials::new(
            self.config.address.clone(),
            self.config.password.expose_secret().to_string(),
        );
        Ok(builder
            .port(port)
            .credentials(creds)
            .timeout(Some(SOCKET_TIMEOUT))
            .build())
    }
}

impl MailTransport for ImapSmtpTransport {
    fn connect(&mut self) -> Result<(), MailError> {
        if self.session.is_some() {
            return Ok(());
        }
        let stream = self.open_stream()?;
        self.login(stream)?;
        info!(host = %self.config.imap_host, user = %self.config.address, "IMAP connected");
        Ok(())
    }

    fn fetch(&mut self, unread_only: bool) -> Result<Vec<InboundEmail>, MailError> {
        let session = self.session()?;

        let select = session.command("SELECT \"INBOX\"")?;
        if !select.ok {
            return Err(MailError::Protocol("SELECT INBOX rejected".into()));
        }

        let criteria = if unread_only { "UNSEEN" } else { "ALL" };
        let search = session.command(&format!("SEARCH {criteria}"))?;
        if !search.ok {
            return Err(MailError::Protocol(format!("SEARCH {criteria} rejected")));
        }
        let ids = parse_search(&search.lines);
        debug!(count = ids.len(), criteria, "IMAP search complete");

        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            // PEEK leaves \Seen untouched; marking is a separate, optional step.
            let resp = session.command(&format!("FETCH {id} BODY.PEEK[]"))?;
            let parsed = resp
                .literals
                .first()
                .and_then(|raw| parse_message(&id, raw));
            match parsed {
                Some(message) => messages.push(message),
                None => warn!(id = %id, "Skipping unparseable message"),
            }
        }
        Ok(messages)
    }

    fn mark_as_read(&mut self, id: &str) -> Result<(), MailError> {
        let resp = self
            .session()?
            .command(&format!("STORE {id} +FLAGS (\\Seen)"))?;
        if !resp.ok {
            return Err(MailError::Protocol(format!("STORE {id} rejected")));
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take()
            && let Err(e) = session.command("LOGOUT")
        {
            debug!(error = %e, "IMAP logout failed");
        }
    }

    fn send(&mut self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let send_err = |reason: String| MailError::Send {
            to: to.to_string(),
            reason,
        };

        let from: Mailbox = self
            .config
            .address
            .parse()
            .map_err(|e| send_err(format!("Invalid from address: {e}")))?;
        let recipient: Mailbox = to
            .parse()
            .map_err(|e| send_err(format!("Invalid to address: {e}")))?;

        let email = Message::builder()
            .from(from)
            .to(recipient)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| send_err(format!("Failed to build email: {e}")))?;

        self.smtp()?
            .send(&email)
            .map_err(|e| send_err(format!("SMTP send failed: {e}")))?;

        info!(to, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Replays canned server output and records what the client wrote.
    struct ScriptedStream {
        input: Cursor<Vec<u8>>,
        written: Arc<Mutex<Vec<u8>>>,
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn config() -> MailConfig {
        MailConfig {
            imap_host: "imap.test.com".into(),
            imap_port: 993,
            imap_use_ssl: true,
            smtp_host: "smtp.test.com".into(),
            smtp_port: 587,
            smtp_use_tls: true,
            address: "support@test.com".into(),
            password: SecretString::from("p\"ass"),
        }
    }

    fn scripted(server: &str) -> (Box<dyn Stream>, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let stream = ScriptedStream {
            input: Cursor::new(server.as_bytes().to_vec()),
            written: written.clone(),
        };
        (Box::new(stream), written)
    }

    const RAW: &str = "From: Alice <alice@example.com>\r\n\
        Subject: Login Error\r\n\
        Date: Fri, 06 Feb 2026 09:15:00 +0800\r\n\
        \r\n\
        I get an error every time\r\n";

    #[test]
    fn literal_marker_parsing() {
        assert_eq!(literal_len("* 1 FETCH (BODY[] {342}\r\n"), Some(342));
        assert_eq!(literal_len("* 1 FETCH (FLAGS (\\Seen))\r\n"), None);
        assert_eq!(literal_len("A1 OK done\r\n"), None);
    }

    #[test]
    fn search_parsing() {
        let lines = vec!["* SEARCH 2 5 9\r\n".to_string(), "A3 OK SEARCH completed\r\n".to_string()];
        assert_eq!(parse_search(&lines), vec!["2", "5", "9"]);
        assert!(parse_search(&["* SEARCH\r\n".to_string()]).is_empty());
    }

    #[test]
    fn quoting_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn parse_plain_message() {
        let msg = parse_message("7", RAW.as_bytes()).unwrap();
        assert_eq!(msg.id, "7");
        assert_eq!(msg.from, "alice@example.com");
        assert_eq!(msg.subject, "Login Error");
        assert_eq!(msg.body, "I get an error every time");
        assert!(msg.date.starts_with("2026-02-06T09:15:00"));
    }

    #[test]
    fn parse_html_only_message() {
        let raw = "From: bob@example.com\r\nSubject: Hi\r\nContent-Type: text/html\r\n\r\n<p>Hello <b>there</b></p>\r\n";
        let msg = parse_message("1", raw.as_bytes()).unwrap();
        assert!(msg.body.contains("Hello"));
        assert!(!msg.body.contains("<p>"));
        assert_eq!(msg.date, "");
    }

    #[test]
    fn strip_html_whitespace_normalized() {
        assert_eq!(strip_html("<p>  Hello   World  </p>"), "Hello World");
        assert_eq!(strip_html("No HTML here"), "No HTML here");
    }

    #[test]
    fn scripted_session_fetch_and_mark() {
        let server = format!(
            "* OK IMAP ready\r\n\
             A1 OK LOGIN completed\r\n\
             * 3 EXISTS\r\n\
             A2 OK [READ-WRITE] SELECT completed\r\n\
             * SEARCH 3\r\n\
             A3 OK SEARCH completed\r\n\
             * 3 FETCH (BODY[] {{{len}}}\r\n{RAW})\r\n\
             A4 OK FETCH completed\r\n\
             * 3 FETCH (FLAGS (\\Seen))\r\n\
             A5 OK STORE completed\r\n\
             * BYE\r\n\
             A6 OK LOGOUT completed\r\n",
            len = RAW.len()
        );
        let (stream, written) = scripted(&server);

        let mut transport = ImapSmtpTransport::new(config());
        transport.login(stream).unwrap();
        let messages = transport.fetch(true).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "3");
        assert_eq!(messages[0].subject, "Login Error");

        transport.mark_as_read("3").unwrap();
        transport.disconnect();
        assert!(matches!(transport.fetch(true), Err(MailError::NotConnected)));

        let sent = String::from_utf8(written.lock().unwrap().clone()).unwrap();
        assert!(sent.contains("A1 LOGIN \"support@test.com\" \"p\\\"ass\"\r\n"));
        assert!(sent.contains("A3 SEARCH UNSEEN\r\n"));
        assert!(sent.contains("A4 FETCH 3 BODY.PEEK[]\r\n"));
        assert!(sent.contains("A5 STORE 3 +FLAGS (\\Seen)\r\n"));
        assert!(sent.contains("A6 LOGOUT\r\n"));
    }

    #[test]
    fn rejected_login_is_login_error() {
        let (stream, _) = scripted("* OK ready\r\nA1 NO [AUTHENTICATIONFAILED] bad creds\r\n");
        let mut transport = ImapSmtpTransport::new(config());
        let err = transport.login(stream).unwrap_err();
        assert!(matches!(err, MailError::Login { .. }));
    }

    #[test]
    fn fetch_without_connect_fails() {
        let mut transport = ImapSmtpTransport::new(config());
        assert!(matches!(transport.fetch(false), Err(MailError::NotConnected)));
        assert!(matches!(transport.mark_as_read("1"), Err(MailError::NotConnected)));
    }

    #[test]
    fn send_rejects_bad_recipient() {
        let mut transport = ImapSmtpTransport::new(config());
        let err = transport.send("not an address", "Re: x", "body").unwrap_err();
        assert!(matches!(err, MailError::Send { .. }));
    }
}
