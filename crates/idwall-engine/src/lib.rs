use std::collections::BTreeMap;
use std::env;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use idwall_contracts::catalog::{accent_colors, MINDSETS, ROLES, STYLES};
use idwall_contracts::events::{EventWriter, SessionEvent};
use idwall_contracts::prompt::AttributeSet;
use idwall_contracts::session::{
    FavoriteEntry, GenerationEntry, SessionStore, Theme, STORAGE_FILE_NAME,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::Rng;
use reqwest::blocking::Client as HttpClient;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const IMAGE_WIDTH: u32 = 768;
pub const IMAGE_HEIGHT: u32 = 1344;
pub const SEED_UPPER_BOUND: u32 = 100_000;
pub const DEFAULT_GENERATION_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_SERVICE: &str = "pollinations";
pub const POLLINATIONS_API_BASE: &str = "https://image.pollinations.ai";
pub const DRYRUN_API_BASE: &str = "dryrun://image";
pub const EVENTS_FILE_NAME: &str = "events.jsonl";

#[derive(Debug, Clone)]
pub struct ImageBytes {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// A text-to-image backend addressed purely by URL.
pub trait ImageService: Send + Sync {
    fn name(&self) -> &str;
    fn api_base(&self) -> &str;

    fn request_url(&self, prompt: &str, seed: u32) -> String {
        build_request_url(self.api_base(), prompt, seed)
    }

    fn fetch(&self, url: &str) -> Result<ImageBytes>;
}

#[derive(Default)]
pub struct ImageServiceRegistry {
    services: BTreeMap<String, Box<dyn ImageService>>,
}

impl ImageServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: ImageService + 'static>(&mut self, service: S) {
        self.services
            .insert(service.name().to_string(), Box::new(service));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ImageService> {
        self.services.get(name).map(|service| service.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    /// The service whose base URL prefixes `url`, if any.
    pub fn owner_of(&self, url: &str) -> Option<&dyn ImageService> {
        self.services
            .values()
            .find(|service| url.starts_with(service.api_base()))
            .map(|service| service.as_ref())
    }
}

pub struct PollinationsService {
    api_base: String,
    http: HttpClient,
}

impl PollinationsService {
    pub fn new() -> Self {
        Self::with_api_base(
            non_empty_env("IDWALL_IMAGE_API_BASE")
                .unwrap_or_else(|| POLLINATIONS_API_BASE.to_string()),
        )
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim().trim_end_matches('/').to_string(),
            http: HttpClient::new(),
        }
    }
}

impl Default for PollinationsService {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageService for PollinationsService {
    fn name(&self) -> &str {
        "pollinations"
    }

    fn api_base(&self) -> &str {
        &self.api_base
    }

    fn fetch(&self, url: &str) -> Result<ImageBytes> {
        let response = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("failed downloading wallpaper ({})", truncate_text(url, 96)))?;
        if !response.status().is_success() {
            let code = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            bail!(
                "image service request failed ({code}): {}",
                truncate_text(&body, 512)
            );
        }
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .context("failed reading wallpaper bytes")?
            .to_vec();
        Ok(ImageBytes { bytes, mime_type })
    }
}

/// Offline stand-in: every URL renders to one solid color.
pub struct DryrunService;

impl ImageService for DryrunService {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn api_base(&self) -> &str {
        DRYRUN_API_BASE
    }

    fn fetch(&self, url: &str) -> Result<ImageBytes> {
        let (r, g, b) = color_from_url(url);
        let mut canvas = RgbImage::new(IMAGE_WIDTH, IMAGE_HEIGHT);
        for pixel in canvas.pixels_mut() {
            *pixel = Rgb([r, g, b]);
        }
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("failed encoding dryrun wallpaper")?;
        Ok(ImageBytes {
            bytes,
            mime_type: Some("image/png".to_string()),
        })
    }
}

pub fn default_service_registry() -> ImageServiceRegistry {
    let mut services = ImageServiceRegistry::new();
    services.register(DryrunService);
    services.register(PollinationsService::new());
    services
}

/// `<base>/prompt/<encoded>?width=768&height=1344&seed=<seed>&nologo=true`
pub fn build_request_url(api_base: &str, prompt: &str, seed: u32) -> String {
    format!(
        "{}/prompt/{}?width={IMAGE_WIDTH}&height={IMAGE_HEIGHT}&seed={seed}&nologo=true",
        api_base.trim_end_matches('/'),
        encode_uri_component(prompt)
    )
}

/// Percent-encodes like a URI component: `A-Z a-z 0-9 - _ . ! ~ * ' ( )` stay literal.
pub fn encode_uri_component(raw: &str) -> String {
    const KEPT: [(&str, &str); 5] = [
        ("%21", "!"),
        ("%27", "'"),
        ("%28", "("),
        ("%29", ")"),
        ("%2A", "*"),
    ];
    KEPT.iter()
        .fold(urlencoding::encode(raw).into_owned(), |encoded, &(escaped, literal)| {
            encoded.replace(escaped, literal)
        })
}

/// Uniform in `[0, SEED_UPPER_BOUND)`.
pub fn random_seed() -> u32 {
    rand::rng().random_range(0..SEED_UPPER_BOUND)
}

/// Random role, mindset, style and accent; the device is kept.
pub fn random_attributes(device: &str) -> AttributeSet {
    let mut rng = rand::rng();
    let colors = accent_colors();
    let accent = colors
        .get_index(rng.random_range(0..colors.len()))
        .map(|(hex, _)| (*hex).to_string())
        .unwrap_or_default();
    AttributeSet {
        role: ROLES[rng.random_range(0..ROLES.len())].to_string(),
        mindset: MINDSETS[rng.random_range(0..MINDSETS.len())].to_string(),
        style: STYLES[rng.random_range(0..STYLES.len())].to_string(),
        device: device.to_string(),
        accent_color: accent,
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub service: String,
    pub generation_delay: Duration,
}

impl EngineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            service: DEFAULT_SERVICE.to_string(),
            generation_delay: DEFAULT_GENERATION_DELAY,
        }
    }
}

pub struct WallpaperEngine {
    events: EventWriter,
    store: SessionStore,
    services: ImageServiceRegistry,
    service_name: String,
    generation_delay: Duration,
    attributes: AttributeSet,
    current_image: Option<String>,
}

impl WallpaperEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_services(config, default_service_registry())
    }

    pub fn with_services(config: EngineConfig, services: ImageServiceRegistry) -> Result<Self> {
        let data_dir = config.data_dir;
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed creating {}", data_dir.display()))?;
        if services.get(&config.service).is_none() {
            bail!(
                "unknown image service '{}' (available: {})",
                config.service,
                services.names().join(", ")
            );
        }

        let events = EventWriter::new(
            data_dir.join(EVENTS_FILE_NAME),
            Uuid::new_v4().to_string(),
        );
        let store = SessionStore::open(data_dir.join(STORAGE_FILE_NAME));

        events.record(&SessionEvent::SessionStarted {
            data_dir: data_dir.to_string_lossy().to_string(),
            service: config.service.clone(),
            history_len: store.history().len(),
            favorites_len: store.favorites().len(),
            theme: store.theme(),
        })?;
        for warning in store.load_warnings() {
            events.record(&SessionEvent::StorageRecovered {
                warning: warning.clone(),
            })?;
        }

        Ok(Self {
            events,
            store,
            services,
            service_name: config.service,
            generation_delay: config.generation_delay,
            attributes: AttributeSet::default(),
            current_image: None,
        })
    }

    pub fn events_path(&self) -> &Path {
        self.events.path()
    }

    pub fn history(&self) -> &[GenerationEntry] {
        self.store.history()
    }

    pub fn favorites(&self) -> &[FavoriteEntry] {
        self.store.favorites()
    }

    pub fn theme(&self) -> Theme {
        self.store.theme()
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn set_attributes(&mut self, attributes: AttributeSet) {
        self.attributes = attributes;
    }

    pub fn set_role(&mut self, role: impl Into<String>) {
        self.attributes.role = role.into();
    }

    pub fn set_mindset(&mut self, mindset: impl Into<String>) {
        self.attributes.mindset = mindset.into();
    }

    pub fn set_style(&mut self, style: impl Into<String>) {
        self.attributes.style = style.into();
    }

    pub fn set_device(&mut self, device: impl Into<String>) {
        self.attributes.device = device.into();
    }

    pub fn set_accent_color(&mut self, accent_color: impl Into<String>) {
        self.attributes.accent_color = accent_color.into();
    }

    pub fn current_image(&self) -> Option<&str> {
        self.current_image.as_deref()
    }

    pub fn preview_prompt(&self) -> String {
        self.attributes.prompt()
    }

    /// Builds the prompt and URL, waits out the simulated processing delay,
    /// then records the result as the newest history entry.
    pub fn generate(&mut self) -> Result<GenerationEntry> {
        let attributes = self.attributes.clone();
        let prompt = attributes.prompt();
        self.events.record(&SessionEvent::PromptBuilt {
            prompt: prompt.clone(),
            attributes: attributes.clone(),
        })?;

        let seed = random_seed();
        let url = self.active_service()?.request_url(&prompt, seed);
        self.current_image = None;
        self.events.record(&SessionEvent::GenerationStarted {
            service: self.service_name.clone(),
            seed,
            url: url.clone(),
            delay_ms: u64::try_from(self.generation_delay.as_millis()).unwrap_or(u64::MAX),
        })?;

        if !self.generation_delay.is_zero() {
            thread::sleep(self.generation_delay);
        }

        let entry = GenerationEntry::new(url, now_millis(), &attributes);
        self.store.record_generation(entry.clone())?;
        self.current_image = Some(entry.url.clone());
        self.events.record(&SessionEvent::GenerationFinished {
            timestamp: entry.timestamp,
            url: entry.url.clone(),
            history_len: self.store.history().len(),
        })?;
        Ok(entry)
    }

    pub fn surprise(&mut self) -> Result<GenerationEntry> {
        let attributes = random_attributes(&self.attributes.device);
        self.events.record(&SessionEvent::AttributesRandomized {
            attributes: attributes.clone(),
        })?;
        self.attributes = attributes;
        self.generate()
    }

    /// Restores the form and the displayed image from a history entry.
    pub fn load_from_history(&mut self, index: usize) -> Result<GenerationEntry> {
        let Some(entry) = self.store.history().get(index).cloned() else {
            bail!(
                "no history entry at index {index} ({} stored)",
                self.store.history().len()
            );
        };
        self.attributes = entry.attributes();
        self.current_image = Some(entry.url.clone());
        self.events.record(&SessionEvent::HistoryLoaded {
            index,
            timestamp: entry.timestamp,
            url: entry.url.clone(),
        })?;
        Ok(entry)
    }

    /// Favorites the displayed image with the form's role, mindset and style,
    /// or an explicit `url` with the attributes it was generated from.
    /// Returns `None` when it is already a favorite.
    pub fn add_favorite(&mut self, url: Option<&str>) -> Result<Option<FavoriteEntry>> {
        let (url, attributes) = match url {
            Some(url) => (url.to_string(), self.attributes_for(url)?),
            None => match &self.current_image {
                Some(url) => (url.clone(), self.attributes.clone()),
                None => bail!("no wallpaper is displayed; generate or load one first"),
            },
        };
        if self.store.is_favorite(&url) {
            return Ok(None);
        }
        let favorite = FavoriteEntry::new(url, now_millis(), &attributes);
        self.store.add_favorite(favorite.clone())?;
        self.events.record(&SessionEvent::FavoriteAdded {
            timestamp: favorite.timestamp,
            url: favorite.url.clone(),
        })?;
        Ok(Some(favorite))
    }

    pub fn remove_favorite(&mut self, timestamp: i64) -> Result<usize> {
        let removed = self.store.remove_favorite(timestamp)?;
        self.events
            .record(&SessionEvent::FavoriteRemoved { timestamp, removed })?;
        Ok(removed)
    }

    pub fn is_favorite(&self, url: &str) -> bool {
        self.store.is_favorite(url)
    }

    /// Callers are expected to have confirmed with the user.
    pub fn clear_history(&mut self) -> Result<usize> {
        let removed = self.store.clear_history()?;
        self.events.record(&SessionEvent::HistoryCleared { removed })?;
        Ok(removed)
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.store.set_theme(theme)?;
        self.events.record(&SessionEvent::ThemeChanged { theme })?;
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let next = self.store.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    /// Fetches `url` (or the displayed image) and saves it as
    /// `out_dir/wallpaper-<millis>.png`.
    pub fn download(&self, url: Option<&str>, out_dir: &Path) -> Result<PathBuf> {
        let Some(url) = url.or(self.current_image.as_deref()) else {
            bail!("no wallpaper is displayed; generate or load one first");
        };
        let service = match self.services.owner_of(url) {
            Some(service) => service,
            None => self.active_service()?,
        };
        let fetched = service.fetch(url)?;
        let decoded = image::load_from_memory(&fetched.bytes).with_context(|| {
            format!(
                "{} returned data that is not an image ({})",
                service.name(),
                fetched.mime_type.as_deref().unwrap_or("unknown type")
            )
        })?;

        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("failed creating {}", out_dir.display()))?;
        let path = out_dir.join(download_file_name(now_millis()));
        decoded
            .save_with_format(&path, ImageFormat::Png)
            .with_context(|| format!("failed to save {}", path.display()))?;

        self.events.record(&SessionEvent::DownloadSaved {
            service: service.name().to_string(),
            url: url.to_string(),
            path: path.to_string_lossy().to_string(),
            width: decoded.width(),
            height: decoded.height(),
        })?;
        Ok(path)
    }

    pub fn finish(&mut self) -> Result<()> {
        self.events.record(&SessionEvent::SessionFinished {
            history_len: self.store.history().len(),
            favorites_len: self.store.favorites().len(),
            theme: self.store.theme(),
        })?;
        Ok(())
    }

    /// History entries carry their own attributes; the displayed image takes
    /// the form's. Any other URL was never generated here.
    fn attributes_for(&self, url: &str) -> Result<AttributeSet> {
        if let Some(entry) = self.store.history().iter().find(|entry| entry.url == url) {
            return Ok(entry.attributes());
        }
        if self.current_image.as_deref() == Some(url) {
            return Ok(self.attributes.clone());
        }
        bail!(
            "{} is not in history; only generated wallpapers can be favorited",
            truncate_text(url, 96)
        )
    }

    fn active_service(&self) -> Result<&dyn ImageService> {
        self.services
            .get(&self.service_name)
            .with_context(|| format!("image service '{}' is not registered", self.service_name))
    }
}

pub fn download_file_name(timestamp: i64) -> String {
    format!("wallpaper-{timestamp}.png")
}

fn color_from_url(url: &str) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use idwall_contracts::catalog::{accent_colors, MINDSETS, ROLES, STYLES};
    use idwall_contracts::session::{SessionStore, Theme, HISTORY_LIMIT, STORAGE_FILE_NAME};
    use serde_json::Value;

    use super::{
        build_request_url, default_service_registry, download_file_name, encode_uri_component,
        random_attributes, random_seed, EngineConfig, ImageService, PollinationsService, WallpaperEngine,
        DRYRUN_API_BASE, IMAGE_HEIGHT, IMAGE_WIDTH, SEED_UPPER_BOUND,
    };

    fn dryrun_engine(data_dir: &Path) -> anyhow::Result<WallpaperEngine> {
        let mut config = EngineConfig::new(data_dir);
        config.service = "dryrun".to_string();
        config.generation_delay = Duration::ZERO;
        WallpaperEngine::new(config)
    }

    fn event_types(path: &Path) -> anyhow::Result<Vec<String>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(raw
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|row| row.get("type").and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    #[test]
    fn request_url_embeds_encoded_prompt_and_fixed_params() {
        let url = build_request_url("https://image.pollinations.ai/", "Founder / Builder & co", 42);
        assert_eq!(
            url,
            "https://image.pollinations.ai/prompt/Founder%20%2F%20Builder%20%26%20co?width=768&height=1344&seed=42&nologo=true"
        );
    }

    #[test]
    fn request_url_keeps_newlines_out_of_the_path() {
        let url = build_request_url("https://x", "line one\nline two", 0);
        assert!(url.contains("line%20one%0Aline%20two"));
        assert!(!url.contains('\n'));
    }

    #[test]
    fn uri_component_encoding_keeps_unreserved_marks() {
        assert_eq!(encode_uri_component("Founder (solo)!"), "Founder%20(solo)!");
        assert_eq!(encode_uri_component("it's *bold* ~ok~"), "it's%20*bold*%20~ok~");
        assert_eq!(encode_uri_component("50% #1 & more"), "50%25%20%231%20%26%20more");
        let url = build_request_url("https://x", "Founder (solo)!", 3);
        assert!(url.starts_with("https://x/prompt/Founder%20(solo)!?"));
    }

    #[test]
    fn random_seed_stays_in_range() {
        for _ in 0..1000 {
            assert!(random_seed() < SEED_UPPER_BOUND);
        }
    }

    #[test]
    fn random_attributes_draw_from_option_lists() {
        let colors = accent_colors();
        for _ in 0..50 {
            let attrs = random_attributes("desktop");
            assert!(ROLES.contains(&attrs.role.as_str()));
            assert!(MINDSETS.contains(&attrs.mindset.as_str()));
            assert!(STYLES.contains(&attrs.style.as_str()));
            assert!(colors.contains_key(attrs.accent_color.as_str()));
            assert_eq!(attrs.device, "desktop");
        }
    }

    #[test]
    fn registry_resolves_service_by_url_prefix() {
        let registry = default_service_registry();
        assert_eq!(registry.names(), vec!["dryrun", "pollinations"]);
        let dryrun_url = build_request_url(DRYRUN_API_BASE, "p", 1);
        assert_eq!(
            registry.owner_of(&dryrun_url).map(|service| service.name().to_string()),
            Some("dryrun".to_string())
        );
        assert!(registry.owner_of("ftp://elsewhere/x.png").is_none());
    }

    #[test]
    fn unknown_service_is_rejected() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut config = EngineConfig::new(temp.path());
        config.service = "midjourney".to_string();
        let err = WallpaperEngine::new(config).err().map(|err| err.to_string());
        assert!(err.unwrap_or_default().contains("unknown image service 'midjourney'"));
        Ok(())
    }

    #[test]
    fn generate_records_history_and_events_in_order() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut engine = dryrun_engine(temp.path())?;
        engine.set_role("Student");
        engine.set_mindset("Morning energy");
        engine.set_style("Pastel dreamscape");
        engine.set_accent_color("#43e97b");

        let entry = engine.generate()?;
        assert!(entry.url.starts_with("dryrun://image/prompt/"));
        assert!(entry.url.contains("fresh%20mint%20green"));
        assert!(entry.url.contains("portrait%209%3A16%20smartphone%20format"));
        assert_eq!(entry.role, "Student");
        assert_eq!(entry.accent_color, "#43e97b");
        assert_eq!(engine.current_image(), Some(entry.url.as_str()));
        assert_eq!(engine.history().first(), Some(&entry));
        engine.finish()?;

        let types = event_types(engine.events_path())?;
        let position = |name: &str| types.iter().position(|value| value == name);
        let started = position("session_started").expect("missing session_started");
        let built = position("prompt_built").expect("missing prompt_built");
        let begun = position("generation_started").expect("missing generation_started");
        let done = position("generation_finished").expect("missing generation_finished");
        let finished = position("session_finished").expect("missing session_finished");
        assert!(started < built);
        assert!(built < begun);
        assert!(begun < done);
        assert!(done < finished);

        let reopened = SessionStore::open(temp.path().join(STORAGE_FILE_NAME));
        assert_eq!(reopened.history(), engine.history());
        Ok(())
    }

    #[test]
    fn generate_waits_out_the_configured_delay() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut config = EngineConfig::new(temp.path());
        config.service = "dryrun".to_string();
        config.generation_delay = Duration::from_millis(30);
        let mut engine = WallpaperEngine::new(config)?;
        let started = std::time::Instant::now();
        engine.generate()?;
        assert!(started.elapsed() >= Duration::from_millis(30));
        Ok(())
    }

    #[test]
    fn history_stays_bounded_across_generations() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut engine = dryrun_engine(temp.path())?;
        let mut urls = Vec::new();
        for _ in 0..=HISTORY_LIMIT {
            urls.push(engine.generate()?.url);
        }
        assert_eq!(engine.history().len(), HISTORY_LIMIT);
        assert_eq!(engine.history()[0].url, urls[HISTORY_LIMIT]);
        assert_eq!(engine.history()[HISTORY_LIMIT - 1].url, urls[1]);
        assert!(engine
            .history()
            .windows(2)
            .all(|pair| pair[0].timestamp >= pair[1].timestamp));
        Ok(())
    }

    #[test]
    fn surprise_keeps_device_and_generates() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut engine = dryrun_engine(temp.path())?;
        engine.set_device("desktop");
        let entry = engine.surprise()?;
        assert_eq!(entry.device, "desktop");
        assert!(ROLES.contains(&entry.role.as_str()));
        assert_eq!(engine.attributes(), &entry.attributes());
        assert!(event_types(engine.events_path())?.contains(&"attributes_randomized".to_string()));
        Ok(())
    }

    #[test]
    fn load_from_history_restores_form_and_image() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut engine = dryrun_engine(temp.path())?;
        engine.set_device("desktop");
        engine.set_role("Minimalist");
        let first = engine.generate()?;
        engine.set_device("mobile");
        engine.set_role("Student");
        engine.generate()?;

        let loaded = engine.load_from_history(1)?;
        assert_eq!(loaded, first);
        assert_eq!(engine.attributes().role, "Minimalist");
        assert_eq!(engine.attributes().device, "desktop");
        assert_eq!(engine.current_image(), Some(first.url.as_str()));

        assert!(engine.load_from_history(5).is_err());
        Ok(())
    }

    #[test]
    fn favorites_gate_on_displayed_url() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut engine = dryrun_engine(temp.path())?;
        assert!(engine.add_favorite(None).is_err());

        let entry = engine.generate()?;
        let favorite = engine.add_favorite(None)?.expect("first favorite is added");
        assert_eq!(favorite.url, entry.url);
        assert_eq!(favorite.role, entry.role);
        assert!(engine.is_favorite(&entry.url));
        assert!(engine.add_favorite(None)?.is_none());
        assert_eq!(engine.favorites().len(), 1);

        assert_eq!(engine.remove_favorite(favorite.timestamp)?, 1);
        assert!(!engine.is_favorite(&entry.url));
        Ok(())
    }

    #[test]
    fn favorite_by_url_uses_the_attributes_it_was_generated_with() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut first = dryrun_engine(temp.path())?;
        first.set_role("Student");
        first.set_mindset("Evening wind-down");
        first.set_style("Monochrome zen");
        let entry = first.generate()?;

        let mut second = dryrun_engine(temp.path())?;
        assert_eq!(second.attributes().role, "Focused professional");
        let favorite = second
            .add_favorite(Some(&entry.url))?
            .expect("history url is added");
        assert_eq!(favorite.role, "Student");
        assert_eq!(favorite.mindset, "Evening wind-down");
        assert_eq!(favorite.style, "Monochrome zen");
        Ok(())
    }

    #[test]
    fn favorite_by_unknown_url_is_rejected() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut engine = dryrun_engine(temp.path())?;
        engine.generate()?;
        let err = engine
            .add_favorite(Some("https://elsewhere.example/cat.png"))
            .err()
            .map(|err| err.to_string())
            .unwrap_or_default();
        assert!(err.contains("not in history"));
        assert!(engine.favorites().is_empty());
        Ok(())
    }

    #[test]
    fn clear_history_and_theme_persist() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut engine = dryrun_engine(temp.path())?;
        engine.generate()?;
        engine.generate()?;
        assert_eq!(engine.clear_history()?, 2);
        assert_eq!(engine.toggle_theme()?, Theme::Light);

        let reopened = dryrun_engine(temp.path())?;
        assert!(reopened.history().is_empty());
        assert_eq!(reopened.theme(), Theme::Light);
        Ok(())
    }

    #[test]
    fn download_saves_png_from_dryrun() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut engine = dryrun_engine(&temp.path().join("data"))?;
        assert!(engine.download(None, temp.path()).is_err());

        engine.generate()?;
        let out_dir = temp.path().join("downloads");
        let path = engine.download(None, &out_dir)?;
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or_default()
            .to_string();
        assert!(name.starts_with("wallpaper-"));
        assert!(name.ends_with(".png"));

        let saved = image::open(&path)?;
        assert_eq!(saved.width(), IMAGE_WIDTH);
        assert_eq!(saved.height(), IMAGE_HEIGHT);
        assert!(event_types(engine.events_path())?.contains(&"download_saved".to_string()));
        Ok(())
    }

    #[test]
    fn download_file_name_uses_timestamp() {
        assert_eq!(download_file_name(1_700_000_000_000), "wallpaper-1700000000000.png");
    }

    #[test]
    fn pollinations_fetch_reports_connection_failure() {
        let service = PollinationsService::with_api_base("http://127.0.0.1:9/");
        assert_eq!(service.api_base(), "http://127.0.0.1:9");
        let url = service.request_url("calm", 7);
        assert!(url.starts_with("http://127.0.0.1:9/prompt/calm?"));
        assert!(service.fetch(&url).is_err());
    }

    #[test]
    fn corrupt_storage_is_logged_as_recovered() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        std::fs::write(temp.path().join(STORAGE_FILE_NAME), "not json")?;
        let engine = dryrun_engine(temp.path())?;
        assert!(engine.history().is_empty());
        assert!(event_types(engine.events_path())?.contains(&"storage_recovered".to_string()));

        let reopened = dryrun_engine(temp.path())?;
        let recovered = event_types(reopened.events_path())?
            .iter()
            .filter(|kind| *kind == "storage_recovered")
            .count();
        assert_eq!(recovered, 1);
        Ok(())
    }
}
