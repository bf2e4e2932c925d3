use serde_json::Value;
use sha2::{Digest, Sha256};

/// Stable lowercase-hex digest used by the deterministic driver modes to
/// derive addresses, signatures, and ids from their inputs.
pub(crate) fn short_digest(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher
        .finalize()
        .iter()
        .take(16)
        .map(|b| format!("{b:02x}"))
        .collect()
}

pub(crate) fn deterministic_address(tag: &str) -> String {
    format!("aleo1{}", short_digest(&[b"address", tag.as_bytes()]))
}

pub(crate) fn deterministic_plaintext(owner: &str, ciphertext: &str) -> String {
    let digest = short_digest(&[b"plaintext", ciphertext.as_bytes()]);
    format!("{{ owner: {owner}.private, data: {digest}field.private }}")
}

pub(crate) fn deterministic_record(
    owner: &str,
    program_id: &str,
    index: u8,
    with_plaintext: bool,
) -> Value {
    let id = short_digest(&[b"record", program_id.as_bytes(), &[index]]);
    let ciphertext = format!("record1{id}");
    let mut record = serde_json::json!({
        "id": id,
        "owner": owner,
        "program_id": program_id,
        "spent": false,
        "ciphertext": ciphertext,
    });
    if with_plaintext {
        record["plaintext"] = Value::String(deterministic_plaintext(owner, &ciphertext));
    }
    record
}

pub(crate) fn deterministic_event(program_id: &str, function_id: Option<&str>, index: u8) -> Value {
    serde_json::json!({
        "_id": short_digest(&[b"event", program_id.as_bytes(), &[index]]),
        "type": "Execute",
        "programId": program_id,
        "functionId": function_id.unwrap_or("transfer_public"),
        "status": "Finalized",
    })
}
