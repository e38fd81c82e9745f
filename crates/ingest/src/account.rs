use std::fs;
use std::path::Path;

use jevons_core::AccountInfo;
use jevons_store::tsv::iso_from_epoch;
use serde_json::Value;
use tracing::debug;

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Extracts account metadata from the CLI's `~/.claude.json`.
/// Unreadable files and files without `oauthAccount` yield an empty account.
pub fn account_from_file(path: &Path, now: i64) -> AccountInfo {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "account file not readable");
            return AccountInfo::default();
        }
    };
    let Ok(root) = serde_json::from_slice::<Value>(&raw) else {
        debug!(path = %path.display(), "account file is not json");
        return AccountInfo::default();
    };
    let Some(oauth) = root.get("oauthAccount").filter(|value| value.is_object()) else {
        return AccountInfo::default();
    };
    AccountInfo {
        email: string_field(oauth, "emailAddress"),
        member_id: string_field(oauth, "accountUuid"),
        organization: string_field(oauth, "organizationName")
            .or_else(|| string_field(oauth, "organizationUuid")),
        display_name: string_field(oauth, "displayName"),
        billing_type: string_field(oauth, "billingType"),
        generated_at: Some(iso_from_epoch(now)),
    }
}

/// `account.json` body; an account without identity renders as `{}`.
pub fn render_account(account: &AccountInfo) -> serde_json::Result<Vec<u8>> {
    if account.is_empty() {
        return Ok(b"{}\n".to_vec());
    }
    let mut body = serde_json::to_vec_pretty(account)?;
    body.push(b'\n');
    Ok(body)
}
