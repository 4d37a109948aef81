//! Builder for synthetic market pages.
//!
//! Produces HTML with a `__NUXT_DATA__` reference array shaped like the
//! live site's, so parser and pipeline tests never need the network.

use serde_json::{json, Map, Value};

/// One stock entry. Fields are raw JSON so tests can inject bad values.
#[derive(Debug, Clone)]
pub struct StockFixture {
    symbol: Value,
    company: Value,
    sector: Option<String>,
    close: Value,
    previous_price: Value,
    volume: Value,
    change_percent: Option<Value>,
}

impl StockFixture {
    pub fn new(symbol: &str, company: &str, close: f64, previous: f64, volume: u64) -> Self {
        Self {
            symbol: json!(symbol),
            company: json!(company),
            sector: None,
            close: json!(close),
            previous_price: json!(previous),
            volume: json!(volume),
            change_percent: None,
        }
    }

    pub fn sector(mut self, name: &str) -> Self {
        self.sector = Some(name.to_string());
        self
    }

    pub fn close(mut self, value: Value) -> Self {
        self.close = value;
        self
    }

    pub fn previous(mut self, value: Value) -> Self {
        self.previous_price = value;
        self
    }

    pub fn volume(mut self, value: Value) -> Self {
        self.volume = value;
        self
    }

    pub fn change(mut self, value: Value) -> Self {
        self.change_percent = Some(value);
        self
    }
}

const LIST_SLOT: usize = 7;

/// Accumulates the flat reference array and renders the page.
#[derive(Debug, Clone)]
pub struct NuxtPage {
    values: Vec<Value>,
    list: Vec<Value>,
}

impl Default for NuxtPage {
    fn default() -> Self {
        Self::new()
    }
}

impl NuxtPage {
    pub fn new() -> Self {
        let values = vec![
            json!(["ShallowReactive", 1]),
            json!({ "data": 2, "state": 3 }),
            json!({}),
            json!({}),
            json!({ "status": 5, "message": 6, "data": LIST_SLOT }),
            json!(200),
            json!("ok"),
            Value::Null,
        ];
        Self {
            values,
            list: Vec::new(),
        }
    }

    /// Drop the `data` pointer so the parser has to use its fallback search.
    pub fn without_data_pointer(mut self) -> Self {
        self.values[4] = json!({ "status": 5, "message": 6 });
        self
    }

    fn push(&mut self, value: Value) -> usize {
        self.values.push(value);
        self.values.len() - 1
    }

    pub fn stock(mut self, stock: StockFixture) -> Self {
        let mut obj = Map::new();
        obj.insert("symbol".into(), json!(self.push(stock.symbol)));
        obj.insert("company_name".into(), json!(self.push(stock.company)));
        obj.insert("close".into(), json!(self.push(stock.close)));
        obj.insert("previous_price".into(), json!(self.push(stock.previous_price)));
        obj.insert("volume".into(), json!(self.push(stock.volume)));
        if let Some(change) = stock.change_percent {
            obj.insert("change_percent".into(), json!(self.push(change)));
        }
        if let Some(sector) = stock.sector {
            let name = self.push(json!(sector));
            let sector_obj = self.push(json!({ "name": name, "id": name }));
            obj.insert("sector".into(), json!(sector_obj));
        }
        let idx = self.push(Value::Object(obj));
        self.list.push(json!(idx));
        self
    }

    /// Add a list entry pointing at an arbitrary value.
    pub fn raw(mut self, value: Value) -> Self {
        let idx = self.push(value);
        self.list.push(json!(idx));
        self
    }

    /// The reference array as JSON text.
    pub fn json(&self) -> String {
        let mut values = self.values.clone();
        values[LIST_SLOT] = Value::Array(self.list.clone());
        Value::Array(values).to_string()
    }

    pub fn html(&self) -> String {
        format!(
            "<!DOCTYPE html><html><head><title>NSE Live</title></head>\
             <body><div id=\"__nuxt\"></div>\
             <script type=\"application/json\" id=\"__NUXT_DATA__\" data-ssr=\"true\">{}</script>\
             </body></html>",
            self.json()
        )
    }
}
