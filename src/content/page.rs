use crate::record::{self, Record};
use crate::Error;

/// A shared web page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageContent {
    pub url: String,
    pub title: Option<String>,
    pub desc: Option<String>,
    pub icon: Option<Vec<u8>>,
}

impl PageContent {
    pub(crate) fn parse(record: &mut Record) -> Result<Self, Error> {
        let page = Self {
            url: record::require_str(record, "URL")?.to_string(),
            title: record::get_str(record, "title")?.map(str::to_string),
            desc: record::get_str(record, "desc")?.map(str::to_string),
            icon: record::get_bytes(record, "icon")?,
        };
        for key in ["URL", "title", "desc", "icon"] {
            record.remove(key);
        }
        Ok(page)
    }

    pub(crate) fn write_to(&self, record: &mut Record) {
        record::put(record, "URL", Some(self.url.as_str()));
        record::put(record, "title", self.title.as_deref());
        record::put(record, "desc", self.desc.as_deref());
        record::put_bytes(record, "icon", self.icon.as_deref());
    }
}

/// A money amount, used by both money and transfer contents.
#[derive(Clone, Debug, PartialEq)]
pub struct MoneyContent {
    pub currency: String,
    pub amount: f64,
}

impl MoneyContent {
    pub fn new(currency: impl Into<String>, amount: f64) -> Result<Self, Error> {
        if !amount.is_finite() {
            return Err(Error::invalid("amount", "a finite number"));
        }
        Ok(Self {
            currency: currency.into(),
            amount,
        })
    }

    pub(crate) fn parse(record: &mut Record) -> Result<Self, Error> {
        let currency = record::require_str(record, "currency")?.to_string();
        let amount = record
            .get("amount")
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| Error::missing("amount"))?;
        record.remove("currency");
        record.remove("amount");
        Ok(Self { currency, amount })
    }

    pub(crate) fn write_to(&self, record: &mut Record) {
        record::put(record, "currency", Some(self.currency.as_str()));
        record::put(record, "amount", Some(self.amount));
    }
}
