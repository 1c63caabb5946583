//! `apt_key` - GPG keys in apt's keyring, managed through `apt-key`

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use resource_api::types::is_absolute_path;
use resource_api::{
    Attribute, Change, ChangeKind, CommandRunner, Provider, ProviderContext, ProviderLogger,
    ResourceDefinition, ResourceHash,
};
use serde_json::Value;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

use super::gpg;
use crate::config::AptKeyConfig;

const LIST_ARGS: [&str; 5] = [
    "adv",
    "--list-keys",
    "--with-colons",
    "--fingerprint",
    "--fixed-list-mode",
];

/// Upper bound for downloaded key files
const MAX_KEY_SIZE: u64 = 1024 * 1024;

const DOCS: &str = "
This type provides the capabilities to manage GPG keys needed by apt to
perform package validation. Apt has its own GPG keyring that can be
manipulated through the `apt-key` command.

    apt_key { '6F6B15509CF8E59E6E469F327F438280EF8D349F':
      source => 'http://apt.puppetlabs.com/pubkey.gpg'
    }

**Autorequires**: if given the location of a key file which looks like an
absolute path this type will autorequire that file.
";

/// The `apt_key` resource type, with `server` defaulting to `keyserver`
pub fn definition(keyserver: &str) -> ResourceDefinition {
    ResourceDefinition::new("apt_key")
        .docs(DOCS)
        .attribute(
            Attribute::new("ensure", "Enum[present, absent]")
                .docs("Whether this apt key should be present or absent on the target system."),
        )
        .attribute(
            Attribute::new(
                "id",
                r"Variant[Pattern[/\A(0x)?[0-9a-fA-F]{8}\Z/], Pattern[/\A(0x)?[0-9a-fA-F]{16}\Z/], Pattern[/\A(0x)?[0-9a-fA-F]{40}\Z/]]",
            )
            .docs("The ID of the key you want to manage.")
            .namevar(),
        )
        .attribute(
            Attribute::new("content", "Optional[String]")
                .docs("The content of, or string representing, a GPG key."),
        )
        .attribute(
            Attribute::new(
                "source",
                r"Variant[Stdlib::Absolutepath, Pattern[/\A(https?|ftp):\/\//]]",
            )
            .docs("Location of a GPG key file, /path/to/file, http:// or https://"),
        )
        .attribute(
            Attribute::new(
                "server",
                r"Pattern[/\A((hkp|http|https):\/\/)?([a-z\d])([a-z\d-]{0,61}\.)+[a-z\d]+(:\d{2,5})?$/]",
            )
            .docs("The key server to fetch the key from based on the ID. It can either be a domain name or url.")
            .default_value(keyserver),
        )
        .attribute(
            Attribute::new("options", "Optional[String]")
                .docs("Additional options to pass to apt-key's --keyserver-options."),
        )
        .attribute(
            Attribute::new("fingerprint", "String")
                .docs("The 40-digit hexadecimal fingerprint of the specified GPG key.")
                .read_only(),
        )
        .attribute(
            Attribute::new("long", "String")
                .docs("The 16-digit hexadecimal id of the specified GPG key.")
                .read_only(),
        )
        .attribute(
            Attribute::new("short", "String")
                .docs("The 8-digit hexadecimal id of the specified GPG key.")
                .read_only(),
        )
        .attribute(
            Attribute::new("expired", "Boolean")
                .docs("Indicates if the key has expired.")
                .read_only(),
        )
        .attribute(
            Attribute::new("expiry", "Optional[String]")
                .docs("The date the key will expire, or undef if it has no expiry date, in ISO 8601 format.")
                .read_only(),
        )
        .attribute(
            Attribute::new("size", "Optional[Integer]")
                .docs("The key size, usually a multiple of 1024.")
                .read_only(),
        )
        .attribute(
            Attribute::new("type", "String")
                .docs("The key type, one of: rsa, dsa, ecc, ecdsa.")
                .read_only(),
        )
        .attribute(
            Attribute::new("created", "Optional[String]")
                .docs("Date the key was created, in ISO 8601 format.")
                .read_only(),
        )
        .autorequire("file", "$source")
        .autorequire("package", "apt")
}

/// Strip a `0x` prefix and upper-case a key id
pub fn normalize_id(id: &str) -> String {
    id.strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .unwrap_or(id)
        .to_ascii_uppercase()
}

/// Downloads a key file
pub type Fetch = fn(&str) -> Result<Vec<u8>>;

fn download_key(url: &str) -> Result<Vec<u8>> {
    let agent = ureq::Agent::new_with_defaults();

    let mut response = agent
        .get(url)
        .header("User-Agent", "rapi")
        .call()
        .with_context(|| format!("Failed to download {url}"))?;

    response
        .body_mut()
        .with_config()
        .limit(MAX_KEY_SIZE)
        .read_to_vec()
        .context("Failed to read key file")
}

/// Where a `source` key comes from
enum KeySource<'a> {
    Remote(&'a str),
    Local(&'a Path),
}

impl<'a> KeySource<'a> {
    /// Accept http(s) URLs and existing local files
    fn parse(source: &'a str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return Ok(Self::Remote(source));
        }
        if source.starts_with("ftp://") {
            bail!("ftp sources are not supported: {source}");
        }
        if is_absolute_path(source) {
            let path = Path::new(source);
            if !path.is_file() {
                bail!("key file {source} does not exist");
            }
            return Ok(Self::Local(path));
        }
        bail!("unsupported key source: {source}")
    }
}

impl fmt::Display for KeySource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => f.write_str(url),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A key file on disk, removed on drop when it is temporary
enum KeyFile {
    Local(PathBuf),
    Temp(NamedTempFile),
}

impl KeyFile {
    fn temporary(content: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("apt_key")
            .tempfile()
            .context("Failed to create temporary key file")?;
        file.write_all(content)?;
        file.flush()?;
        Ok(Self::Temp(file))
    }

    fn path(&self) -> &Path {
        match self {
            Self::Local(path) => path,
            Self::Temp(file) => file.path(),
        }
    }
}

pub struct AptKeyProvider {
    runner: Arc<dyn CommandRunner>,
    config: AptKeyConfig,
    fetch: Fetch,
    now: fn() -> DateTime<Utc>,
}

impl AptKeyProvider {
    pub fn new(runner: Arc<dyn CommandRunner>, config: AptKeyConfig) -> Self {
        Self {
            runner,
            config,
            fetch: download_key,
            now: Utc::now,
        }
    }

    #[cfg(test)]
    fn with_fetch(mut self, fetch: Fetch) -> Self {
        self.fetch = fetch;
        self
    }

    #[cfg(test)]
    fn with_clock(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn list_keys(&self) -> Result<Vec<gpg::KeyRecord>> {
        let output = self
            .runner
            .run_capture(&self.config.command, &LIST_ARGS)
            .context("Failed to list apt keys")?;
        Ok(gpg::parse_listing(&output))
    }

    /// Run `apt-key`, or only report the command in noop mode
    fn apt_key(&self, log: &mut ProviderLogger, name: &str, noop: bool, args: &[&str]) -> Result<()> {
        if noop {
            log.notice(
                name,
                &format!("would run: {} {}", self.config.command, args.join(" ")),
            );
            return Ok(());
        }
        self.runner.run_capture(&self.config.command, args)?;
        Ok(())
    }

    fn delete(&self, log: &mut ProviderLogger, change: &Change, noop: bool) -> Result<()> {
        let fingerprint = change
            .current_str("fingerprint")
            .or_else(|| change.current_str("id"))
            .unwrap_or(&change.name)
            .to_string();
        let short = change
            .current_str("short")
            .map(str::to_string)
            .unwrap_or_else(|| fingerprint[fingerprint.len().saturating_sub(8)..].to_string());

        if noop {
            return self.apt_key(log, &change.name, true, &["del", &short]);
        }

        let attempts = self.config.delete_attempts.max(1);
        for attempt in 1..=attempts {
            self.apt_key(log, &change.name, false, &["del", &short])?;
            if !self
                .list_keys()?
                .iter()
                .any(|k| k.fingerprint == fingerprint)
            {
                return Ok(());
            }
            log::debug!("{} still listed after attempt {}", short, attempt);
        }
        bail!("key {short} is still present after {attempts} attempts of apt-key del")
    }

    fn create(&self, log: &mut ProviderLogger, change: &Change, noop: bool) -> Result<()> {
        let name = change.name.as_str();

        if let Some(content) = change.target_str("content") {
            if noop {
                return self.preview_add(log, name, "<content>");
            }
            let file = KeyFile::temporary(content.as_bytes())?;
            return self.add_file(log, name, &file);
        }

        if let Some(source) = change.target_str("source") {
            let source = KeySource::parse(source)?;
            if noop {
                if let KeySource::Remote(url) = source {
                    log.notice(name, &format!("would download {url}"));
                }
                return self.preview_add(log, name, &source.to_string());
            }
            let file = self.source_to_file(source)?;
            return self.add_file(log, name, &file);
        }

        // apt-key fails unless --recv-keys is the last argument
        let server = change
            .target_str("server")
            .unwrap_or(&self.config.keyserver);
        let mut args = vec!["adv", "--keyserver", server];
        if let Some(options) = change.target_str("options") {
            args.extend(["--keyserver-options", options]);
        }
        args.extend(["--recv-keys", name]);
        self.apt_key(log, name, noop, &args)
    }

    fn add_file(&self, log: &mut ProviderLogger, name: &str, file: &KeyFile) -> Result<()> {
        self.verify(log, name, file.path())?;
        let path = file.path().to_string_lossy();
        self.apt_key(log, name, false, &["add", &*path])
    }

    /// Report what `add_file` would run for a key from `origin`
    fn preview_add(&self, log: &mut ProviderLogger, name: &str, origin: &str) -> Result<()> {
        if name.len() == 40 {
            log.notice(
                name,
                &format!(
                    "would run: {} --with-fingerprint --with-colons {origin}",
                    self.config.gpg
                ),
            );
        }
        self.apt_key(log, name, true, &["add", origin])
    }

    fn source_to_file(&self, source: KeySource<'_>) -> Result<KeyFile> {
        match source {
            KeySource::Remote(url) => {
                let content = (self.fetch)(url)?;
                KeyFile::temporary(&content)
            }
            KeySource::Local(path) => Ok(KeyFile::Local(path.to_path_buf())),
        }
    }

    /// Check that a key file contains the fingerprint named by a full id
    fn verify(&self, log: &mut ProviderLogger, name: &str, path: &Path) -> Result<()> {
        if name.len() != 40 {
            return Ok(());
        }
        let gpg = self.config.gpg.as_str();
        if !self.runner.is_executable(gpg) {
            log.warning(name, &format!("{gpg} cannot be found for verification of the id."));
            return Ok(());
        }

        let path = path.to_string_lossy();
        let output = self
            .runner
            .run(gpg, &["--with-fingerprint", "--with-colons", &*path])?;
        let listing = output.stdout_str();
        if !gpg::fingerprints(&listing)
            .iter()
            .any(|f| f.eq_ignore_ascii_case(name))
        {
            bail!(
                "The id in your manifest {name} and the fingerprint from content/source do not match. \
                 Please check there is not an error in the id or check the content/source is legitimate."
            );
        }
        Ok(())
    }
}

impl Provider for AptKeyProvider {
    fn get(&self, _ctx: &mut ProviderContext) -> Result<Vec<ResourceHash>> {
        let now = (self.now)();
        Ok(self
            .list_keys()?
            .iter()
            .map(|key| key.to_hash(now))
            .collect())
    }

    fn set(&self, ctx: &mut ProviderContext, changes: &[Change]) -> Result<()> {
        let noop = ctx.noop;

        for change in changes {
            let name = change.name.as_str();
            if name.len() < 40 {
                ctx.logger.warning(
                    name,
                    "The id should be a full fingerprint (40 characters) to avoid collision attacks.",
                );
            }
            if change.target_str("content").is_some() && change.target_str("source").is_some() {
                ctx.logger
                    .fail(name, "The properties content and source are mutually exclusive");
                continue;
            }

            match change.kind {
                ChangeKind::Delete if noop => {
                    if let Err(e) = self.delete(&mut ctx.logger, change, true) {
                        ctx.logger.fail(name, &format!("{e:#}"));
                    }
                }
                ChangeKind::Create if noop => {
                    if let Err(e) = self.create(&mut ctx.logger, change, true) {
                        ctx.logger.fail(name, &format!("{e:#}"));
                    }
                }
                ChangeKind::Delete => {
                    ctx.logger
                        .deleting(name, |log| self.delete(log, change, false));
                }
                ChangeKind::Create => {
                    ctx.logger
                        .creating(name, |log| self.create(log, change, false));
                }
                ChangeKind::Update => {
                    ctx.logger.notice(
                        name,
                        &format!(
                            "updating existing keys is not supported (changed: {})",
                            change.changed.join(", ")
                        ),
                    );
                }
                ChangeKind::NoChange => {}
            }
        }
        Ok(())
    }

    fn canonicalize(&self, _ctx: &mut ProviderContext, resource: &mut ResourceHash) -> Result<()> {
        if let Some(Value::String(id)) = resource.get_mut("id") {
            *id = normalize_id(id);
        }
        Ok(())
    }

    fn same_resource(&self, current: &str, target: &str) -> bool {
        current
            .to_ascii_uppercase()
            .ends_with(&normalize_id(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::gpg::SAMPLE_LISTING;
    use crate::resource::testing::ScriptedRunner;
    use resource_api::{CommandOutput, ReconcileOptions, Registry, Status, reconcile_simple};
    use serde_json::json;

    const LIST: &str = "apt-key adv --list-keys --with-colons --fingerprint --fixed-list-mode";
    const BLUE_JEANS: &str = "BBCB188AD7B3228BCF05BD554C0BE21B5FF054BD";

    fn clock() -> DateTime<Utc> {
        DateTime::from_timestamp(1_600_000_000, 0).unwrap()
    }

    fn provider(runner: &Arc<ScriptedRunner>) -> AptKeyProvider {
        AptKeyProvider::new(runner.clone(), AptKeyConfig::default()).with_clock(clock)
    }

    fn hash(value: Value) -> ResourceHash {
        value.as_object().cloned().unwrap()
    }

    fn create(target: Value) -> Change {
        let target = hash(target);
        Change {
            name: target["id"].as_str().unwrap().to_string(),
            kind: ChangeKind::Create,
            current: None,
            target,
            changed: Vec::new(),
        }
    }

    fn delete(id: &str) -> Change {
        let current = gpg::parse_listing(SAMPLE_LISTING)
            .into_iter()
            .find(|k| k.fingerprint.ends_with(id))
            .unwrap()
            .to_hash(clock());
        Change {
            name: id.to_string(),
            kind: ChangeKind::Delete,
            current: Some(current),
            target: hash(json!({ "id": id, "ensure": "absent" })),
            changed: Vec::new(),
        }
    }

    fn statuses(ctx: &ProviderContext) -> Vec<(Status, String)> {
        ctx.logger
            .events()
            .iter()
            .map(|e| (e.status, e.message.clone()))
            .collect()
    }

    #[test]
    fn test_definition_compiles() {
        let rtype = resource_api::ResourceType::compile(definition("keys.example.org")).unwrap();
        assert_eq!(rtype.namevar(), "id");
        assert_eq!(
            rtype.attribute("server").unwrap().0.default,
            Some(json!("keys.example.org"))
        );
        assert!(rtype.attribute("fingerprint").unwrap().0.read_only);
    }

    #[test]
    fn test_get_lists_keys() {
        let runner = Arc::new(ScriptedRunner::new().expect(LIST, CommandOutput::ok(SAMPLE_LISTING)));
        let mut ctx = ProviderContext::new("apt_key", false);

        let keys = provider(&runner).get(&mut ctx).unwrap();
        assert_eq!(keys.len(), 5);
        assert_eq!(keys[0]["id"], json!(BLUE_JEANS));
        assert_eq!(keys[0]["short"], json!("5FF054BD"));
        assert_eq!(keys[3]["expired"], json!(true));
        assert_eq!(runner.calls(), [LIST]);
    }

    #[test]
    fn test_get_propagates_listing_failure() {
        let runner = Arc::new(
            ScriptedRunner::new().expect(LIST, CommandOutput::failed("gpg: keyring locked")),
        );
        let mut ctx = ProviderContext::new("apt_key", false);

        let err = format!("{:#}", provider(&runner).get(&mut ctx).unwrap_err());
        assert!(err.starts_with("Failed to list apt keys: "));
        assert!(err.ends_with("failed: gpg: keyring locked"));
    }

    #[test]
    fn test_identity() {
        let runner = Arc::new(ScriptedRunner::new());
        let provider = provider(&runner);
        let mut ctx = ProviderContext::new("apt_key", false);

        let mut target = hash(json!({ "id": "0x5ff054bd" }));
        provider.canonicalize(&mut ctx, &mut target).unwrap();
        assert_eq!(target["id"], json!("5FF054BD"));

        assert!(provider.same_resource(BLUE_JEANS, "5FF054BD"));
        assert!(provider.same_resource(BLUE_JEANS, "0x4c0be21b5ff054bd"));
        assert!(!provider.same_resource(BLUE_JEANS, "7FAC5991"));
    }

    #[test]
    fn test_delete_until_gone() {
        let without: String = SAMPLE_LISTING
            .lines()
            .skip(2)
            .skip_while(|l| !l.starts_with("pub:-:1024"))
            .map(|l| format!("{l}\n"))
            .collect();
        let runner = Arc::new(
            ScriptedRunner::new()
                .expect("apt-key del 5FF054BD", CommandOutput::ok("OK\n"))
                .expect(LIST, CommandOutput::ok(SAMPLE_LISTING))
                .expect("apt-key del 5FF054BD", CommandOutput::ok("OK\n"))
                .expect(LIST, CommandOutput::ok(&without)),
        );
        let mut ctx = ProviderContext::new("apt_key", false);

        provider(&runner)
            .set(&mut ctx, &[delete(BLUE_JEANS)])
            .unwrap();
        assert!(runner.is_finished());
        assert_eq!(
            statuses(&ctx),
            [
                (Status::Deleting, String::new()),
                (Status::Deleted, String::new())
            ]
        );
    }

    #[test]
    fn test_delete_gives_up_after_attempts() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .expect("apt-key del 5FF054BD", CommandOutput::ok(""))
                .expect(LIST, CommandOutput::ok(SAMPLE_LISTING))
                .expect("apt-key del 5FF054BD", CommandOutput::ok(""))
                .expect(LIST, CommandOutput::ok(SAMPLE_LISTING)),
        );
        let config = AptKeyConfig {
            delete_attempts: 2,
            ..Default::default()
        };
        let provider = AptKeyProvider::new(runner.clone(), config).with_clock(clock);
        let mut ctx = ProviderContext::new("apt_key", false);

        provider.set(&mut ctx, &[delete(BLUE_JEANS)]).unwrap();
        assert!(ctx.logger.failed(BLUE_JEANS));
        assert_eq!(
            ctx.logger.events().last().unwrap().message,
            "key 5FF054BD is still present after 2 attempts of apt-key del"
        );
    }

    #[test]
    fn test_create_from_keyserver() {
        let runner = Arc::new(ScriptedRunner::new().expect(
            "apt-key adv --keyserver hkp://keys.example.org --keyserver-options http-proxy=http://proxy:3128 --recv-keys 5FF054BD",
            CommandOutput::ok(""),
        ));
        let mut ctx = ProviderContext::new("apt_key", false);
        let change = create(json!({
            "id": "5FF054BD",
            "ensure": "present",
            "server": "hkp://keys.example.org",
            "options": "http-proxy=http://proxy:3128",
        }));

        provider(&runner).set(&mut ctx, &[change]).unwrap();
        assert!(runner.is_finished());
        let events = statuses(&ctx);
        assert_eq!(events[0].0, Status::Warning);
        assert_eq!(events.last().unwrap().0, Status::Created);
    }

    #[test]
    fn test_create_from_content_verifies_fingerprint() {
        let gpg_listing = "pub:-:2048:1:4C0BE21B5FF054BD:1370645731:::-:::scESC:::::::\n\
                           fpr:::::::::BBCB188AD7B3228BCF05BD554C0BE21B5FF054BD:\n";
        let runner = Arc::new(
            ScriptedRunner::new()
                .executable("/usr/bin/gpg")
                .expect(
                    "/usr/bin/gpg --with-fingerprint --with-colons ",
                    CommandOutput::ok(gpg_listing),
                )
                .expect("apt-key add ", CommandOutput::ok("OK\n")),
        );
        let mut ctx = ProviderContext::new("apt_key", false);
        let change = create(json!({ "id": BLUE_JEANS, "content": "-----BEGIN PGP PUBLIC KEY BLOCK-----" }));

        provider(&runner).set(&mut ctx, &[change]).unwrap();
        assert!(runner.is_finished());
        assert!(!ctx.logger.has_failures());
        assert_eq!(
            runner.files(),
            [
                "-----BEGIN PGP PUBLIC KEY BLOCK-----",
                "-----BEGIN PGP PUBLIC KEY BLOCK-----"
            ]
        );
    }

    #[test]
    fn test_content_fingerprint_mismatch_fails() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .executable("/usr/bin/gpg")
                .expect(
                    "/usr/bin/gpg --with-fingerprint --with-colons ",
                    CommandOutput::ok("fpr:::::::::4CCA1EAF950CEE4AB83976DCA040830F7FAC5991:\n"),
                ),
        );
        let mut ctx = ProviderContext::new("apt_key", false);
        let change = create(json!({ "id": BLUE_JEANS, "content": "key" }));

        provider(&runner).set(&mut ctx, &[change]).unwrap();
        assert!(ctx.logger.failed(BLUE_JEANS));
        assert!(runner.calls().iter().all(|c| !c.starts_with("apt-key add")));
    }

    #[test]
    fn test_missing_gpg_only_warns() {
        let runner = Arc::new(ScriptedRunner::new().expect("apt-key add ", CommandOutput::ok("")));
        let mut ctx = ProviderContext::new("apt_key", false);
        let change = create(json!({ "id": BLUE_JEANS, "content": "key" }));

        provider(&runner).set(&mut ctx, &[change]).unwrap();
        let events = statuses(&ctx);
        assert_eq!(events[1].0, Status::Warning);
        assert_eq!(events[1].1, "/usr/bin/gpg cannot be found for verification of the id.");
        assert_eq!(events.last().unwrap().0, Status::Created);
    }

    #[test]
    fn test_content_and_source_are_exclusive() {
        let runner = Arc::new(ScriptedRunner::new());
        let mut ctx = ProviderContext::new("apt_key", false);
        let change = create(json!({ "id": BLUE_JEANS, "content": "key", "source": "/tmp/key.gpg" }));

        provider(&runner).set(&mut ctx, &[change]).unwrap();
        assert_eq!(
            statuses(&ctx),
            [(
                Status::Failed,
                "The properties content and source are mutually exclusive".to_string()
            )]
        );
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_sources() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("key.gpg");
        std::fs::write(&local, "local key").unwrap();

        let runner = Arc::new(
            ScriptedRunner::new()
                .expect(&format!("apt-key add {}", local.display()), CommandOutput::ok(""))
                .expect("apt-key add ", CommandOutput::ok("")),
        );
        let provider = provider(&runner).with_fetch(|url| {
            assert_eq!(url, "https://example.org/key.gpg");
            Ok(b"downloaded key".to_vec())
        });
        let mut ctx = ProviderContext::new("apt_key", false);

        let changes = [
            create(json!({ "id": "5FF054BD", "source": local.to_str().unwrap() })),
            create(json!({ "id": "7FAC5991", "source": "https://example.org/key.gpg" })),
            create(json!({ "id": "2B90D010", "source": "ftp://example.org/key.gpg" })),
        ];
        provider.set(&mut ctx, &changes).unwrap();

        assert!(!ctx.logger.failed("5FF054BD"));
        assert!(!ctx.logger.failed("7FAC5991"));
        assert!(ctx.logger.failed("2B90D010"));
        assert_eq!(runner.files(), ["local key", "downloaded key"]);
    }

    #[test]
    fn test_update_is_not_supported() {
        let runner = Arc::new(ScriptedRunner::new());
        let mut ctx = ProviderContext::new("apt_key", false);
        let mut change = delete(BLUE_JEANS);
        change.kind = ChangeKind::Update;
        change.changed = vec!["server".to_string()];

        provider(&runner).set(&mut ctx, &[change]).unwrap();
        assert_eq!(
            statuses(&ctx),
            [(
                Status::Notice,
                "updating existing keys is not supported (changed: server)".to_string()
            )]
        );
    }

    #[test]
    fn test_noop_runs_nothing() {
        let runner = Arc::new(ScriptedRunner::new());
        let mut ctx = ProviderContext::new("apt_key", true);
        let changes = [
            delete(BLUE_JEANS),
            create(json!({ "id": "4CCA1EAF950CEE4AB83976DCA040830F7FAC5991", "server": "keyserver.ubuntu.com" })),
        ];

        provider(&runner).set(&mut ctx, &changes).unwrap();
        assert!(runner.calls().is_empty());
        assert_eq!(
            statuses(&ctx),
            [
                (Status::Notice, "would run: apt-key del 5FF054BD".to_string()),
                (
                    Status::Notice,
                    "would run: apt-key adv --keyserver keyserver.ubuntu.com --recv-keys 4CCA1EAF950CEE4AB83976DCA040830F7FAC5991"
                        .to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_noop_skips_download_and_verification() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("key.gpg");
        std::fs::write(&local, "local key").unwrap();

        let runner = Arc::new(ScriptedRunner::new().executable("/usr/bin/gpg"));
        let provider = provider(&runner).with_fetch(|url| panic!("fetched {url} in noop mode"));
        let mut ctx = ProviderContext::new("apt_key", true);
        let changes = [
            create(json!({ "id": BLUE_JEANS, "source": "https://example.org/key.gpg" })),
            create(json!({ "id": "5FF054BD", "source": local.to_str().unwrap() })),
            create(json!({ "id": "4CCA1EAF950CEE4AB83976DCA040830F7FAC5991", "content": "key" })),
            create(json!({ "id": "7FAC5991", "source": "/missing/key.gpg" })),
        ];

        provider.set(&mut ctx, &changes).unwrap();
        assert!(runner.calls().is_empty());
        assert!(runner.files().is_empty());

        let notices: Vec<String> = statuses(&ctx)
            .into_iter()
            .filter(|(status, _)| *status == Status::Notice)
            .map(|(_, message)| message)
            .collect();
        assert_eq!(
            notices,
            [
                "would download https://example.org/key.gpg".to_string(),
                "would run: /usr/bin/gpg --with-fingerprint --with-colons https://example.org/key.gpg"
                    .to_string(),
                "would run: apt-key add https://example.org/key.gpg".to_string(),
                format!("would run: apt-key add {}", local.display()),
                "would run: /usr/bin/gpg --with-fingerprint --with-colons <content>".to_string(),
                "would run: apt-key add <content>".to_string(),
            ]
        );
        assert!(ctx.logger.failed("7FAC5991"));
    }

    #[test]
    fn test_reconcile_short_id_against_listing() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .expect(LIST, CommandOutput::ok(SAMPLE_LISTING))
                .expect("apt-key del 5FF054BD", CommandOutput::ok(""))
                .expect(LIST, CommandOutput::ok("")),
        );
        let mut registry = Registry::new();
        registry.define(definition("keyserver.ubuntu.com")).unwrap();
        registry.implement("apt_key", provider(&runner)).unwrap();

        let targets = [
            hash(json!({ "id": "0x5ff054bd", "ensure": "absent" })),
            hash(json!({ "id": "4CCA1EAF950CEE4AB83976DCA040830F7FAC5991" })),
        ];
        let result =
            reconcile_simple(registry.get("apt_key").unwrap(), &targets, ReconcileOptions::default())
                .unwrap();

        assert_eq!(result.summary.removed, 1);
        assert_eq!(result.summary.no_change, 1);
        assert!(runner.is_finished());
    }
}
