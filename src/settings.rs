use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::store::{Filter, FilterValue, RowStore};

pub const LOGO_KEY: &str = "logo_url";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolBranding {
    pub logo_url: String,
}

/// Logo configured in `school_config`, or an empty string when it cannot be read.
pub async fn logo_url(store: Option<&dyn RowStore>) -> SchoolBranding {
    let Some(store) = store else {
        return SchoolBranding {
            logo_url: String::new(),
        };
    };

    let filter = Filter::equals("key", FilterValue::Text(LOGO_KEY.to_string()));
    let logo_url = match store.fetch("school_config", Some(&filter), &[]).await {
        Ok(rows) => rows
            .first()
            .and_then(|row| row.get("value"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Err(err) => {
            warn!(error = %err, "could not read school config");
            String::new()
        }
    };

    SchoolBranding { logo_url }
}
