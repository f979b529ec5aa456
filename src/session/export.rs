//! Read-side serializations of a finished (or aborted) session.
//!
//! Pure functions over the store: nothing here mutates session state.
//! The CSV shape is a fixed 13-column contract consumed by downstream
//! analysis scripts; string fields are always quoted with embedded quotes
//! doubled, null values render as empty cells.

use serde_json::json;

use super::store::{SessionStore, TrialRecord};

/// The fixed trial-export header, one column per [`TrialRecord`] field.
pub const CSV_HEADER: &str = "sessionId,phase,tStimOn,digit,isTarget,responded,keyDown,rtMs,correct,lapse,riskScore,selfReportActive,vibrated";

/// Full-session JSON export: `{ sessionId, meta, trials, surveys }`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json(store: &SessionStore) -> Result<String, serde_json::Error> {
    let value = json!({
        "sessionId": store.session_id(),
        "meta": store.meta(),
        "trials": store.trials(),
        "surveys": store.surveys(),
    });
    serde_json::to_string_pretty(&value)
}

/// Delimited-text export: header row plus one row per trial in emission
/// order.
#[must_use]
pub fn to_csv(store: &SessionStore) -> String {
    let mut lines = Vec::with_capacity(store.trials().len() + 1);
    lines.push(CSV_HEADER.to_string());
    for trial in store.trials() {
        lines.push(csv_row(trial));
    }
    lines.join("\n")
}

fn csv_row(t: &TrialRecord) -> String {
    [
        quote(t.session_id.as_str()),
        quote(&t.phase.to_string()),
        quote(&t.t_stim_on.to_rfc3339()),
        t.digit.to_string(),
        t.is_target.to_string(),
        t.responded.to_string(),
        t.key_down.as_deref().map_or_else(String::new, quote),
        t.rt_ms.map_or_else(String::new, |rt| rt.to_string()),
        t.correct.to_string(),
        t.lapse.to_string(),
        t.risk_score.to_string(),
        t.self_report_active.to_string(),
        t.vibrated.to_string(),
    ]
    .join(",")
}

/// Quotes a string field: wrapped in double quotes, embedded quotes doubled.
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::session::Phase;
    use chrono::Utc;

    fn trial_with_key(key: &str) -> TrialRecord {
        TrialRecord {
            session_id: "VG_test".to_string(),
            phase: Phase::BlockA,
            t_stim_on: Utc::now(),
            digit: 3,
            is_target: true,
            responded: true,
            key_down: Some(key.to_string()),
            rt_ms: Some(412),
            correct: true,
            lapse: false,
            risk_score: 0.3,
            self_report_active: false,
            vibrated: false,
        }
    }

    /// Splits one CSV row by the standard rule: quoted fields may contain
    /// commas, doubled quotes decode to one quote.
    fn split_csv(row: &str) -> Vec<String> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = row.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '"' if in_quotes => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        current.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                '"' => in_quotes = true,
                ',' if !in_quotes => {
                    fields.push(std::mem::take(&mut current));
                }
                other => current.push(other),
            }
        }
        fields.push(current);
        fields
    }

    #[test]
    fn header_matches_contract() {
        let store = SessionStore::new(SessionConfig::default());
        let csv = to_csv(&store);
        assert_eq!(csv, CSV_HEADER);
    }

    #[test]
    fn row_count_matches_emission_order() {
        let mut store = SessionStore::new(SessionConfig::default());
        store.append_trial(trial_with_key("Space"));
        store.append_trial(trial_with_key("Space"));
        let csv = to_csv(&store);
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn embedded_comma_and_quote_round_trip() {
        let mut store = SessionStore::new(SessionConfig::default());
        let nasty = "Key,with \"quotes\"";
        store.append_trial(trial_with_key(nasty));
        let csv = to_csv(&store);
        let row = csv.lines().nth(1).unwrap();
        let fields = split_csv(row);
        assert_eq!(fields.len(), 13);
        assert_eq!(fields[6], nasty);
    }

    #[test]
    fn null_fields_render_empty() {
        let mut store = SessionStore::new(SessionConfig::default());
        let mut trial = trial_with_key("Space");
        trial.responded = false;
        trial.key_down = None;
        trial.rt_ms = None;
        store.append_trial(trial);
        let row = to_csv(&store).lines().nth(1).unwrap().to_string();
        let fields = split_csv(&row);
        assert_eq!(fields[6], "");
        assert_eq!(fields[7], "");
    }

    #[test]
    fn json_export_has_top_level_shape() {
        let mut store = SessionStore::new(SessionConfig::default());
        store.append_trial(trial_with_key("Space"));
        let parsed: serde_json::Value = serde_json::from_str(&to_json(&store).unwrap()).unwrap();
        assert_eq!(parsed["sessionId"], store.session_id());
        assert_eq!(parsed["trials"].as_array().unwrap().len(), 1);
        assert!(parsed["meta"]["config"].get("targetFrequency").is_some());
        assert!(parsed["surveys"].as_array().unwrap().is_empty());
    }
}
