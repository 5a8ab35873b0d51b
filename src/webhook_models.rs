use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ad-platform webhook body - a single lead event or a batch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AdLeadPayload {
    Single(AdLeadEvent),
    Batch(Vec<AdLeadEvent>),
}

impl AdLeadPayload {
    /// Convert to a vec of events for uniform processing.
    pub fn into_events(self) -> Vec<AdLeadEvent> {
        match self {
            AdLeadPayload::Single(event) => vec![event],
            AdLeadPayload::Batch(events) => events,
        }
    }
}

/// One lead-gen form submission delivered by an ad platform.
///
/// The form answers arrive as a name -> values list; everything else the
/// platform sends rides along in `raw`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdLeadEvent {
    /// Platform-side lead id, used for deduplication across redeliveries.
    #[serde(alias = "leadgen_id")]
    pub lead_id: String,

    #[serde(default)]
    pub campaign_id: Option<String>,

    #[serde(default)]
    pub form_id: Option<String>,

    #[serde(default)]
    pub created_time: Option<String>,

    /// Form answers: [{"name": "budget", "values": ["5000"]}, ...]
    #[serde(default)]
    pub field_data: Vec<AdLeadField>,

    #[serde(flatten)]
    pub raw: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdLeadField {
    pub name: String,
    #[serde(default)]
    pub values: Vec<Value>,
}

impl AdLeadEvent {
    /// First answer for a named field, if any.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.field_data
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .and_then(|f| f.values.first())
    }

    pub fn full_name(&self) -> Option<String> {
        self.field("full_name")
            .or_else(|| self.field("name"))
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    pub fn lead_type(&self) -> Option<String> {
        self.field("lead_type")
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    /// Flattens the form answers into the scorer's field bag. Single-answer
    /// fields collapse to their value; multi-answer fields stay arrays.
    pub fn to_field_bag(&self) -> Value {
        let mut bag = Map::new();
        for field in &self.field_data {
            let value = match field.values.len() {
                0 => Value::Null,
                1 => field.values[0].clone(),
                _ => Value::Array(field.values.clone()),
            };
            bag.insert(field.name.clone(), value);
        }
        if let Some(campaign_id) = &self.campaign_id {
            bag.insert("campaign_id".to_string(), Value::String(campaign_id.clone()));
        }
        Value::Object(bag)
    }
}

/// Response sent back to the ad platform.
#[derive(Debug, Serialize)]
pub struct AdLeadWebhookResponse {
    pub status: String,
    pub received: usize,
    pub processed: usize,
    pub duplicates: usize,
    /// Events stored but not scored (scoring failure downgraded to warning).
    pub scoring_warnings: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_single_event() {
        let json = r#"
        {
            "lead_id": "lg_123",
            "campaign_id": "c_9",
            "field_data": [
                {"name": "full_name", "values": ["Priya Nair"]},
                {"name": "budget", "values": ["5000"]},
                {"name": "destinations", "values": ["Bali", "Phuket"]}
            ]
        }
        "#;

        let payload: AdLeadPayload = serde_json::from_str(json).unwrap();
        let events = payload.into_events();
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.lead_id, "lg_123");
        assert_eq!(event.full_name(), Some("Priya Nair".to_string()));

        let bag = event.to_field_bag();
        assert_eq!(bag["budget"], json!("5000"));
        assert_eq!(bag["destinations"], json!(["Bali", "Phuket"]));
        assert_eq!(bag["campaign_id"], json!("c_9"));
    }

    #[test]
    fn parses_batch_and_leadgen_id_alias() {
        let json = r#"
        [
            {"leadgen_id": "lg_1", "field_data": []},
            {"leadgen_id": "lg_2", "field_data": [{"name": "budget", "values": []}]}
        ]
        "#;

        let payload: AdLeadPayload = serde_json::from_str(json).unwrap();
        let events = payload.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].lead_id, "lg_1");
        // Empty values list flattens to null
        assert_eq!(events[1].to_field_bag()["budget"], Value::Null);
    }

    #[test]
    fn field_lookup_is_case_insensitive() {
        let event = AdLeadEvent {
            lead_id: "lg_x".to_string(),
            campaign_id: None,
            form_id: None,
            created_time: None,
            field_data: vec![AdLeadField {
                name: "Full_Name".to_string(),
                values: vec![json!("Dev Sharma")],
            }],
            raw: Value::Null,
        };
        assert_eq!(event.full_name(), Some("Dev Sharma".to_string()));
    }
}
