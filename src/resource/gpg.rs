//! Parsing of GnuPG `--with-colons` key listings
//!
//! Field layout follows `/usr/share/doc/gnupg/DETAILS`: for `pub` records
//! field 3 is the key length, 4 the algorithm, 6 the creation and 7 the
//! expiry date. `fpr` records carry the fingerprint in field 10.

use chrono::{DateTime, SecondsFormat, Utc};
use resource_api::ResourceHash;
use serde_json::{Value, json};
use std::fmt;

/// Public key algorithm of a primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    Dsa,
    Ecc,
    Ecdsa,
    Unrecognized,
}

impl KeyType {
    fn from_algorithm(id: &str) -> Self {
        match id {
            "1" => Self::Rsa,
            "17" => Self::Dsa,
            "18" => Self::Ecc,
            "19" => Self::Ecdsa,
            _ => Self::Unrecognized,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
            Self::Dsa => "dsa",
            Self::Ecc => "ecc",
            Self::Ecdsa => "ecdsa",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A primary key from a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub fingerprint: String,
    pub size: Option<u64>,
    pub key_type: KeyType,
    pub created: Option<DateTime<Utc>>,
    pub expiry: Option<DateTime<Utc>>,
}

impl KeyRecord {
    fn from_fields(pub_fields: &[&str], fingerprint: &str) -> Self {
        let field = |i: usize| pub_fields.get(i).copied().unwrap_or_default();
        Self {
            fingerprint: fingerprint.to_string(),
            size: field(2).parse().ok(),
            key_type: KeyType::from_algorithm(field(3)),
            created: epoch(field(5)),
            expiry: epoch(field(6)),
        }
    }

    /// Last 16 hex digits of the fingerprint
    pub fn long(&self) -> &str {
        tail(&self.fingerprint, 16)
    }

    /// Last 8 hex digits of the fingerprint
    pub fn short(&self) -> &str {
        tail(&self.fingerprint, 8)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= now)
    }

    /// The key as an `apt_key` resource hash
    pub fn to_hash(&self, now: DateTime<Utc>) -> ResourceHash {
        let mut hash = ResourceHash::new();
        hash.insert("id".to_string(), json!(self.fingerprint));
        hash.insert("ensure".to_string(), json!("present"));
        hash.insert("fingerprint".to_string(), json!(self.fingerprint));
        hash.insert("long".to_string(), json!(self.long()));
        hash.insert("short".to_string(), json!(self.short()));
        hash.insert("size".to_string(), json!(self.size));
        hash.insert("type".to_string(), json!(self.key_type.as_str()));
        hash.insert("created".to_string(), timestamp(self.created));
        hash.insert("expiry".to_string(), timestamp(self.expiry));
        hash.insert("expired".to_string(), json!(self.is_expired(now)));
        hash
    }
}

fn tail(s: &str, n: usize) -> &str {
    &s[s.len().saturating_sub(n)..]
}

fn epoch(field: &str) -> Option<DateTime<Utc>> {
    let secs = field.parse::<i64>().ok()?;
    DateTime::from_timestamp(secs, 0)
}

fn timestamp(value: Option<DateTime<Utc>>) -> Value {
    match value {
        Some(t) => json!(t.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => Value::Null,
    }
}

/// Primary keys of a colon listing.
///
/// A `pub` record is paired with the first `fpr` record after it. A `sub`
/// record starts a subkey, so a `fpr` after it belongs to the subkey and is
/// skipped.
pub fn parse_listing(output: &str) -> Vec<KeyRecord> {
    let mut keys = Vec::new();
    let mut pending: Option<Vec<&str>> = None;

    for line in output.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        match fields[0] {
            "pub" => pending = Some(fields),
            "sub" | "ssb" | "sec" => pending = None,
            "fpr" => {
                let Some(pub_fields) = pending.take() else {
                    continue;
                };
                let fingerprint = fields.get(9).copied().unwrap_or_default();
                if fingerprint.is_empty() || !fingerprint.bytes().all(|b| b.is_ascii_hexdigit()) {
                    log::warn!("skipping key with malformed fingerprint: {:?}", fingerprint);
                    continue;
                }
                keys.push(KeyRecord::from_fields(&pub_fields, fingerprint));
            }
            _ => {}
        }
    }

    log::debug!("parsed {} keys from listing", keys.len());
    keys
}

/// Every fingerprint in a listing, subkeys included
pub fn fingerprints(output: &str) -> Vec<&str> {
    output
        .lines()
        .filter(|line| line.starts_with("fpr:"))
        .filter_map(|line| line.split(':').nth(9))
        .filter(|fingerprint| !fingerprint.is_empty())
        .collect()
}

#[cfg(test)]
pub(crate) const SAMPLE_LISTING: &str = "\
Executing: /tmp/apt-key-gpghome.C186ICxj0z/gpg.1.sh --list-keys --with-colons --fingerprint --fixed-list-mode
tru:t:1:1485776129:0:3:1:5
pub:-:2048:1:4C0BE21B5FF054BD:1370645731:::-:::scESC:::::::
fpr:::::::::BBCB188AD7B3228BCF05BD554C0BE21B5FF054BD:
uid:-::::1370645731::B3A2F66693E8C5D4B1A6014AC73F5707E76443D7::Blue Jeans Network <netops@bluejeans.com>:
sub:-:2048:1:4AB781597254279C:1370645731::::::e::::::
fpr:::::::::B71ACDE6B52658D12C3106F44AB781597254279C:
pub:-:1024:17:A040830F7FAC5991:1173385030:::-:::scESC:::::::
fpr:::::::::4CCA1EAF950CEE4AB83976DCA040830F7FAC5991:
uid:-::::1175811711::0F5F08408BC3D293942A5E5A2D1AE1BD277FF5DB::Google, Inc. Linux Package Signing Key <linux-packages-keymaster@google.com>:
sub:-:2048:16:4F30B6B4C07CB649:1173385035::::::e::::::
fpr:::::::::9534C9C4130B4DC9927992BF4F30B6B4C07CB649:
pub:-:4096:1:7638D0442B90D010:1416603673:1668891673::-:::scSC:::::::
rvk:::1::::::309911BEA966D0613053045711B4E5FF15B0FD82:80:
rvk:::1::::::FBFABDB541B5DC955BD9BA6EDB16CF5BB12525C4:80:
fpr:::::::::126C0D24BD8A2942CC7DF8AC7638D0442B90D010:
uid:-::::1416603673::15C761B84F0C9C293316B30F007E34BE74546B48::Debian Archive Automatic Signing Key (8/jessie) <ftpmaster@debian.org>:
pub:e:4096:1:1054B7A24BD6EC30:1278720832:1483574797::-:::sc:::::::
fpr:::::::::47B320EB4C7C375AA9DAE1A01054B7A24BD6EC30:
uid:e::::1460074501::BA4BCA138CEBDF8444241CE928DEE1AD79612E6C::Puppet Labs Release Key (Puppet Labs Release Key) <info@puppetlabs.com>:
pub:-:256:22:9A3F1E5C2B7D4E10:1600000000:::-:::scESC:::::::
fpr:::::::::0123456789ABCDEF0123456789ABCDEF9A3F1E5C:
";
