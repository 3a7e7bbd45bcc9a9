use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::types::plans::format_paise;

#[derive(Debug, Clone, Serialize)]
pub struct UpiApp {
    pub name: &'static str,
    pub vpa: &'static str,
    pub description: &'static str,
}

/// UPI apps accepted for manual payments, keyed by app id.
pub static UPI_APPS: LazyLock<BTreeMap<&'static str, UpiApp>> = LazyLock::new(|| {
    BTreeMap::from([
        (
            "phonepe",
            UpiApp {
                name: "PhonePe",
                vpa: "agies@ybl",
                description: "Fast UPI payments with PhonePe",
            },
        ),
        (
            "gpay",
            UpiApp {
                name: "Google Pay",
                vpa: "agies@okicici",
                description: "Secure Google Pay UPI",
            },
        ),
        (
            "paytm",
            UpiApp {
                name: "Paytm",
                vpa: "agies@paytm",
                description: "Paytm UPI payments",
            },
        ),
        (
            "bhim",
            UpiApp {
                name: "BHIM",
                vpa: "agies@upi",
                description: "Government BHIM UPI",
            },
        ),
    ])
});

/// Parameters of a `upi://pay` deep link.
pub struct UpiLink<'a> {
    pub payee_vpa: &'a str,
    pub payee_name: &'a str,
    pub amount_paise: i64,
    pub note: &'a str,
    pub reference: &'a str,
}

impl UpiLink<'_> {
    pub fn to_uri(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("pa", self.payee_vpa)
            .append_pair("pn", self.payee_name)
            .append_pair("am", &format_paise(self.amount_paise))
            .append_pair("cu", "INR")
            .append_pair("tn", self.note)
            .append_pair("tr", self.reference)
            .finish();
        format!("upi://pay?{query}")
    }
}

/// A UPI transaction reference (UTR) is exactly 12 digits.
pub fn is_valid_utr(utr: &str) -> bool {
    utr.len() == 12 && utr.bytes().all(|b| b.is_ascii_digit())
}
