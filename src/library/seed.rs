//! Built-in situation library catalog.
//!
//! Seeded into `scenario_templates` once, on first start against an empty
//! table. Reply bodies are stored as written; agents edit them afterwards.

use crate::store::ScenarioSeed;

pub static SCENARIO_SEEDS: &[ScenarioSeed] = &[
    ScenarioSeed {
        key: "delay_no_update",
        tags: "#delayed-no-update,#not-delivered",
        language: "en",
        title: "Delayed, no tracking update / not delivered",
        reply_template: r#"Hi there,
I’m really sorry for the delay. I’ve already contacted the courier — sometimes their system takes longer to update even when the package is still moving. Please give it a little more time; tracking should update soon.
Thank you so much for your patience!
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "lost_package_insurance",
        tags: "#lost-package,#insurance-claim",
        language: "en",
        title: "Lost package / insurance claim",
        reply_template: r#"Hi there,
I just checked your order, and it looks like the courier lost your package. I’m really sorry about that.
Since you purchased shipping insurance, please file a claim for a refund or replacement here 👇
👉 https://www.imfish.com/pages/worry-free-purchase
This ensures your refund is processed smoothly and securely.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "delivered_not_received",
        tags: "#delivered-not-received,#misdelivered",
        language: "en",
        title: "Shows delivered but not received / misdelivered",
        reply_template: r#"Hi there,
The tracking shows your package was delivered, and the courier confirmed delivery on their end.
Unfortunately, we can’t take further action once it’s marked as delivered. If you purchased insurance, please file a claim here 👇
👉 https://www.imfish.com/pages/worry-free-purchase
Otherwise, please check with your local post office or neighbors — sometimes it’s left nearby.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "reship_same_tracking",
        tags: "#reship-same-order,#resend",
        language: "en",
        title: "Reship under original order / resend",
        reply_template: r#"Hi there,
I’m really sorry for the delay. It looks like we had a system issue between our warehouse and the local post office that caused this problem, and for that, I am truly sorry.
Your order has been reprocessed and reshipped under the same tracking number according to the courier’s policy. You should start seeing new tracking updates within 1–2 days.
As a further apology for this inconvenience, please accept this mfish5 coupon for your next purchase.
Thank you for your patience!
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "wait_for_update",
        tags: "#wait-for-update,#suggest-waiting",
        language: "en",
        title: "Wait for tracking update",
        reply_template: r#"Hi there,
Thanks for checking in! Sometimes tracking updates are delayed even when the package is still on the way. We’ve seen a few cases where it didn’t move for 10–15 days and then suddenly got delivered.
Please give it a bit more time — I’m monitoring it and will update you once there’s movement.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "wrong_color",
        tags: "#wrong-color,#wrong-item-shipped",
        language: "en",
        title: "Wrong color / wrong item shipped",
        reply_template: r#"Hi there,
I’m really sorry — our system shows the correct item, but it looks like the warehouse made a sorting mistake. I’ve already warned them about this issue.
As an apology, I can offer a $3 refund, or we can discuss an exchange depending on stock.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "damaged_not_working",
        tags: "#damaged,#not-working",
        language: "en",
        title: "Damaged product / not working",
        reply_template: r#"Hi there,
I’m really sorry to hear that your item isn’t working. Could you please send a short video showing the issue? And your order id! Once I receive it, I’ll verify and arrange a replacement right away. And please be noticed that we only deal with our website aftersale!
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "tiktok_order",
        tags: "#tiktok-order,#third-party-platform",
        language: "en",
        title: "TikTok order / third-party platform",
        reply_template: r#"Hi there,
Thank you for sharing the details! It looks like your order was placed through TikTok Shop, so we’re unable to process after-sales directly.
Please contact TikTok Shop support via the app — they’ll assist with your replacement or refund.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "amazon_order",
        tags: "#amazon-order,#third-party-platform",
        language: "en",
        title: "Amazon order / third-party platform",
        reply_template: r#"Hello,
Thank you for sharing the details! It appears your order was placed through Amazon, so we are unable to directly handle after-sales matters.
Please contact Amazon customer service through the app—they will assist you with the exchange or refund process.
Best regards,
Clark"#,
    },
    ScenarioSeed {
        key: "insurance_policy_explain",
        tags: "#insurance-policy,#claim-form-complaint",
        language: "en",
        title: "Insurance policy explanation / customer objects to claim form",
        reply_template: r#"Hi there,
I understand this feels inconvenient, and I’m really sorry. However, under the Worry-Free Protection policy, all claims must be filed through the insurance form — we’re not permitted to issue direct refunds or replacements once it’s active.
This protects both sides and guarantees your refund.
👉 https://www.imfish.com/pages/worry-free-purchase
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "emotion_scam_complaint",
        tags: "#scam-accusation,#calm-customer",
        language: "en",
        title: "Customer alleges scam / calming the customer",
        reply_template: r#"Hi there,
I completely understand your frustration, and I’m truly sorry this experience has made you feel that way. Please rest assured we’re not a scam company — you’ve successfully received previous orders from us, and we’re doing everything we can to resolve this issue.
Sometimes courier systems fail to update or mis-handle shipments, but I promise we’re on it.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "replacement_tracking_notice",
        tags: "#replacement-tracking,#calm-customer",
        language: "en",
        title: "Replacement tracking number notice",
        reply_template: r#"Hi there,
Good news — your replacement has just been shipped out! 🎉
Here’s your tracking number: []
You can follow it directly on the carrier’s website for updates.
Please allow a little time for the first scan to appear in the system.
Thank you again for your patience and understanding!
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "charger_not_powerbank",
        tags: "#charger-mistaken-for-power-bank,#140W/65W",
        language: "en",
        title: "Charger mistaken for a power bank (140W/65W)",
        reply_template: r#"Hi there,
Just to clarify — the mfish 140W/65W is a wall charger, not a power bank.
It does not store power, so it will shut off unless it’s plugged into a wall outlet.
If you can send me a short video of how you’re using it, I’ll help you check it step by step.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "wrong_port_no_fast_charge",
        tags: "#wrong-port-no-fast-charge,#not-charging",
        language: "en",
        title: "Wrong port, no fast charge / not charging",
        reply_template: r#"Hi there,
From many cases we’ve seen, this usually happens when the device is plugged into the output-only port instead of the fast-charging port.
Could you send me a short video showing which port you're using?
I’ll help you confirm immediately.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "flashlight_temp_sensor",
        tags: "#flashlight-temperature-sensor,#Funky,#module",
        language: "en",
        title: "Flashlight temperature sensor (Funky / module)",
        reply_template: r#"Hi there,
The flashlight module uses a temperature-sensitive button, so it may not respond when cold.
Try warming your fingertip and tapping again stay at least 5s — it will activate normally.
We are improving this in the next version.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "mystery_box_capacity",
        tags: "#mystery-box-capacity,#10000mAh-no-display",
        language: "en",
        title: "Mystery box capacity misunderstanding (10,000mAh, no digital display)",
        reply_template: r#"Hi there,
The mystery box version is the simplified model — it is 10,000mAh and does not include the digital display.
If you need a version with a screen or higher capacity, feel free to let me know.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "gift_no_aftersale",
        tags: "#gift-no-after-sales,#armored-cable,#mystery-box-gift",
        language: "en",
        title: "Free gifts have no after-sales (armored cable / mystery box gift)",
        reply_template: r#"Hi there,
The free cable included in the promotion is a simplified gift version, so it does not include full after-sales coverage.
If it’s still usable, we’re not able to replace it.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "coupon_not_stackable",
        tags: "#coupons-not-stackable,#newmfisher10",
        language: "en",
        title: "Coupons cannot be combined",
        reply_template: r#"Hi there,
Our discount codes are stand-alone codes and cannot be stacked with other promotions, bundles, or automatic discounts — that’s why the system couldn’t apply it.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "address_change_after_12h",
        tags: "#address-change-after-12h",
        language: "en",
        title: "Wrong address cannot be changed after 12 hours",
        reply_template: r#"Hi there,
We can only change the shipping address within 12 hours of the order being placed.
After the package is shipped, the address cannot be changed from our side — please contact the courier for interception.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "weekend_warehouse_closed",
        tags: "#warehouse-closed-weekends,#tracking-not-updating",
        language: "en",
        title: "Warehouse does not ship on weekends",
        reply_template: r#"Hi there,
Your order was placed over the weekend — our warehouse is closed on Saturday and Sunday, so the package will be scanned once they reopen.
Thank you for your patience!
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "led_button_operation",
        tags: "#light-wont-turn-off,#button-stuck,#E-Tank,#Mushroom",
        language: "en",
        title: "Light won't turn off / button won't press",
        reply_template: r#"Hi there,
The button is designed to be shallow.
A light tap changes colors; long-press for 5 seconds to turn the LED ring off completely.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "charging_mode_explain",
        tags: "#charging-modes,#fast-charge,#slow-charge",
        language: "en",
        title: "Charging modes explained",
        reply_template: r#"Hi there,
Solid light = Fast charging mode
Double-tap the button → Breathing light = Low-current mode (for earbuds & watches).
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "wireless_charge_issue",
        tags: "#wireless-charging-not-working,#MagSafe-not-attaching",
        language: "en",
        title: "Wireless charging not working / MagSafe not attaching",
        reply_template: r#"Hi there,
Could you please send a short video showing the issue?
Most MagSafe problems are related to:
• phone case thickness
• alignment
• coil position
Once I see the video, I’ll help you fix or replace it.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "opened_package_no_return",
        tags: "#opened-package-no-return,#return-policy",
        language: "en",
        title: "Opened package cannot be returned",
        reply_template: r#"Hi there,
We can only accept returns if the product is completely unopened with full original packaging.
Once opened, it cannot be restocked, so a return isn’t possible.
If you’d like, I can offer a small courtesy refund instead.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "extra_compensation_request",
        tags: "#extra-compensation,#damages-request",
        language: "en",
        title: "Request for extra compensation",
        reply_template: r#"Hi there,
I completely understand your frustration.
While we can’t offer compensation beyond the order itself, I can provide a goodwill discount code for your next purchase: mfish5.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "replacement_approved",
        tags: "#replacement-after-confirmation,#ReplacementApproved",
        language: "en",
        title: "Issue confirmed, replacement arranged",
        reply_template: r#"Hi there,
Thank you for sending the video — I’ve reviewed it carefully, and the issue is confirmed.
We will arrange a replacement for you right away.
I'm truly sorry you've encountered this issue. As with all electronics, yield rate issues can occur. We're working with the factory to resolve it! Once again, my apologies.
Before we ship it out, could you please provide your full shipping address (name + street + city + state + ZIP)?
Once the replacement is sent, I’ll share the tracking number with you so you can follow the delivery.
Thank you for your patience — I’ll take care of this for you.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "refund_unopened",
        tags: "#return-and-refund,#unopened",
        language: "en",
        title: "Return and refund (unopened product)",
        reply_template: r#"Hi, sorry it arrived later than expected.
To generate your FedEx return label for a full refund, please send:
1. A photo showing the package(s) unopened/sealed
2. The package dimensions (L × W × H)
3. The packed weight
4. Your return-from address
Once I have these, I’ll create the label and send it over. After you receive it, please drop the package off at a FedEx location. We’ll process the full refund after it’s received and checked in.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "seel_claim_delivered_not_received",
        tags: "#delivered-not-received,#insurance-claim,#Seel",
        language: "en",
        title: "Delivered but not received (file insurance claim)",
        reply_template: r#"Hi, sorry about this.
Our tracking shows the package was marked delivered, but since you didn’t receive it, the next step is to file a claim through Seel Shipping Protection for a missing package — Seel will refund the full amount according to their policy. We don’t control the carrier once it’s in their network.
Please submit your claim here: https://resolve.seel.com
Select “Delivered but not received” and enter your order number + email to complete the claim.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "return_non_quality",
        tags: "#does-not-fit-needs,#bought-wrong-item,#dislike,#non-quality-reason",
        language: "en",
        title: "Return for non-quality reasons",
        reply_template: r#"Hi, sorry about that — I understand it’s not what you needed.
We can help you return your order.
To generate your FedEx return label, please reply with:
1. Item(s) to return: [Item list]
2. Confirm items are unused and in original packaging
3. Outer box dimensions (L × W × H) and packed weight
4. Return-from address (the address you’ll ship from)
Once received, we’ll send the label. Please drop off at a FedEx location. After our warehouse receives and checks the return, we’ll process the refund.
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "chargeback_process",
        tags: "#chargeback,#chargeback-process",
        language: "zh",
        title: "Bank chargeback handling",
        reply_template: r#"1. 首先确认是否可以接受拒付（是否与客户有过沟通，判断主要责任方）。
2. 无沟通记录、非我方过错可在独立站订单页面提交相关证据。"#,
    },
    ScenarioSeed {
        key: "case_closed_thanks",
        tags: "#case-resolved,#customer-thanks",
        language: "en",
        title: "Case resolved (customer says thanks)",
        reply_template: r#"Hi there,
Thank you so much for liking it, it's an honor to be chosen by you, have a great day!
Best,
Clark"#,
    },
    ScenarioSeed {
        key: "replacement_over_return",
        tags: "#confirm-issue-offer-replacement,#avoid-return-shipping",
        language: "en",
        title: "Issue confirmed, suggest replacement over return",
        reply_template: r#"Hello, sorry about this.
But returns will incur high shipping costs, and there is a risk of loss during the return process. If the package is lost, no refund will be issued. If I send you a new product, that would be the best outcome. Do you think that's okay? If you agree, I will ship it to you immediately.
Best,
Clark"#,
    },
];
