use sha2::{Digest, Sha256};

const ASSET_GUID_BYTES: usize = 16;

/// Asset-database style guid: 32 lowercase hex chars derived from the asset path.
pub fn asset_guid_for_path(asset_path: &str) -> String {
    let normalized = normalize_asset_path(asset_path);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    to_hex_lower(&hasher.finalize()[..ASSET_GUID_BYTES])
}

fn normalize_asset_path(path: &str) -> String {
    path.trim().replace('\\', "/")
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
