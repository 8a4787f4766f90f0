//! Config schema types (server, browser engine, WhatsApp driver).

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub server: ServerConfig,
    pub browser: BrowserConfig,
    pub whatsapp: WhatsAppConfig,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on. Defaults to 8787.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Path to a Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    /// Whether to run headless. Defaults to false so the operator can see
    /// the pairing screen in the browser window as well.
    pub headless: bool,
    /// Viewport width.
    pub viewport_width: u32,
    /// Viewport height.
    pub viewport_height: u32,
    /// Navigation timeout in milliseconds.
    pub navigation_timeout_ms: u64,
    /// Additional Chromium arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: false,
            viewport_width: 1280,
            viewport_height: 720,
            navigation_timeout_ms: 30_000,
            chrome_args: vec![
                "--no-sandbox".into(),
                "--disable-setuid-sandbox".into(),
                "--disable-web-security".into(),
                "--disable-features=site-per-process".into(),
            ],
        }
    }
}

/// WhatsApp Web driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    /// Country code prepended to numbers given without a leading `+`.
    pub country_code: String,
    /// Entry URL of the web client.
    pub entry_url: String,
    /// Minimum digits (country code included) a dial string must have.
    pub min_phone_digits: usize,
    /// Timeout for locating the composer input or the pairing QR element.
    pub selector_timeout_ms: u64,
    /// Per-candidate timeout for the invalid-recipient dialog probe.
    pub invalid_check_timeout_ms: u64,
    /// Per-candidate timeout for the sent-acknowledgment marker.
    pub ack_timeout_ms: u64,
    /// Short pause after clicks and focus changes.
    pub settle_ms: u64,
    /// Pause after navigating to a chat, letting the conversation render.
    pub post_navigation_settle_ms: u64,
    /// Pause after pressing Enter before looking for the acknowledgment.
    pub post_send_settle_ms: u64,
    /// Delay between keystrokes while typing the message body.
    pub type_delay_ms: u64,
    /// Default delay between bulk sends, in seconds. Clamped to 1..=60.
    pub bulk_delay_secs: u64,
    /// DOM selector chains for the web client, in probe order.
    pub selectors: SelectorChains,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            country_code: "+91".into(),
            entry_url: "https://web.whatsapp.com".into(),
            min_phone_digits: 8,
            selector_timeout_ms: 10_000,
            invalid_check_timeout_ms: 3_000,
            ack_timeout_ms: 5_000,
            settle_ms: 1_000,
            post_navigation_settle_ms: 5_000,
            post_send_settle_ms: 3_000,
            type_delay_ms: 30,
            bulk_delay_secs: 5,
            selectors: SelectorChains::default(),
        }
    }
}

/// Ordered CSS selector chains for the web client's DOM.
///
/// The client ships new class names and test ids independently of this
/// service, so every lookup walks a chain of candidates and takes the first
/// hit. Override individual chains in the config file when the client UI
/// moves faster than a release.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorChains {
    /// Markers that appear once the account is paired and the chat list loaded.
    pub ready: Vec<String>,
    /// Candidates for the pairing QR element.
    pub qr: Vec<String>,
    /// Close controls for transient overlays and popups.
    pub overlay_close: Vec<String>,
    /// Elements that only render for an unregistered/invalid recipient.
    pub invalid_dialog: Vec<String>,
    /// Page-content substrings (lowercase) flagging an invalid recipient.
    pub invalid_markers: Vec<String>,
    /// Confirm buttons used to dismiss the invalid-recipient dialog.
    pub dialog_confirm: Vec<String>,
    /// Message composer input, most specific first.
    pub composer: Vec<String>,
    /// Markers that a message reached the server (single or double check).
    pub sent_ack: Vec<String>,
    /// Elements carrying the paired account's own number.
    pub identity: Vec<String>,
}

impl Default for SelectorChains {
    fn default() -> Self {
        Self {
            ready: vec![
                "div[role='textbox']".into(),
                "div[title='Search input textbox']".into(),
                "._2_1wd".into(),
                "[data-testid='conversation-panel-wrapper']".into(),
            ],
            qr: vec![
                "canvas[aria-label='Scan me!']".into(),
                "canvas".into(),
                "img[alt='Scan me']".into(),
                "div[data-ref]".into(),
            ],
            overlay_close: vec![
                "button[aria-label='Close']".into(),
                "button[data-testid='x-viewer']".into(),
                "div[role='button'][aria-label='Close']".into(),
            ],
            invalid_dialog: vec!["div[data-testid='invalid-number']".into()],
            invalid_markers: vec!["phone number shared via url is invalid".into()],
            dialog_confirm: vec![
                "button[data-testid='popup-controls-ok']".into(),
                "div[role='dialog'] button".into(),
            ],
            composer: vec![
                "div[contenteditable='true'][data-tab='10']".into(),
                "div[contenteditable='true'][data-tab='9']".into(),
                "div[contenteditable='true'][data-tab]".into(),
                "[contenteditable='true']".into(),
                "div[title='Type a message']".into(),
            ],
            sent_ack: vec![
                "span[data-testid='msg-dblcheck']".into(),
                "span[data-icon='msg-dblcheck']".into(),
                "div[data-testid='msg-check']".into(),
            ],
            identity: vec![
                "[data-testid='conversation-info-header'] [title]".into(),
                "._1lpto".into(),
            ],
        }
    }
}
