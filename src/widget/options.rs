//! Widget options — theme, start screen and composer configuration
//!
//! Serialized in the camelCase shape the widget SDK expects and handed to
//! the host on initialization.

use serde::Serialize;

use crate::chat::ColorScheme;

pub const GREETING: &str = "AI מדפורם";
pub const PLACEHOLDER_INPUT: &str = "כאן לכל שאלה...";

const ACCENT_PRIMARY: &str = "#262f5a";
const FONT_FAMILY: &str = r#""OpenAI Sans", system-ui, -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, "Apple Color Emoji", "Segoe UI Emoji", "Noto Color Emoji", sans-serif"#;
const FONT_FAMILY_MONO: &str = r#"ui-monospace, SFMono-Regular, Menlo, Monaco, Consolas, "Liberation Mono", "DejaVu Sans Mono", "Courier New", monospace"#;
const FONT_SOURCE_URL: &str =
    "https://cdn.openai.com/common/fonts/openai-sans/v2/OpenAISans-Regular.woff2";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetOptions {
    pub theme: ThemeOption,
    pub start_screen: StartScreen,
    pub composer: ComposerOption,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeOption {
    pub color_scheme: ColorScheme,
    pub radius: &'static str,
    pub density: &'static str,
    pub color: ThemeColor,
    pub typography: Typography,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeColor {
    pub grayscale: Grayscale,
    pub accent: Accent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grayscale {
    pub hue: u16,
    pub tint: u8,
    pub shade: i8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accent {
    pub primary: &'static str,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub base_size: u8,
    pub font_family: &'static str,
    pub font_family_mono: &'static str,
    pub font_sources: Vec<FontSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FontSource {
    pub family: &'static str,
    pub src: &'static str,
    pub weight: u16,
    pub style: &'static str,
    pub display: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartScreen {
    pub greeting: &'static str,
    pub prompts: Vec<StarterPrompt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarterPrompt {
    pub label: &'static str,
    pub prompt: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposerOption {
    pub placeholder: &'static str,
    pub attachments: Attachments,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachments {
    pub enabled: bool,
}

/// Theme for `scheme`; only the grayscale shade differs between schemes.
pub fn theme_config(scheme: ColorScheme) -> ThemeOption {
    ThemeOption {
        color_scheme: scheme,
        radius: "pill",
        density: "compact",
        color: ThemeColor {
            grayscale: Grayscale {
                hue: 108,
                tint: 2,
                shade: match scheme {
                    ColorScheme::Dark => -1,
                    ColorScheme::Light => -4,
                },
            },
            accent: Accent {
                primary: ACCENT_PRIMARY,
                level: 1,
            },
        },
        typography: Typography {
            base_size: 16,
            font_family: FONT_FAMILY,
            font_family_mono: FONT_FAMILY_MONO,
            font_sources: vec![FontSource {
                family: "OpenAI Sans",
                src: FONT_SOURCE_URL,
                weight: 400,
                style: "normal",
                display: "swap",
            }],
        },
    }
}

pub fn starter_prompts() -> Vec<StarterPrompt> {
    vec![
        StarterPrompt {
            label: "איזה פיצ'רים יש במדפורם",
            prompt: "מה הפיצ'רים הבולטים שלכם",
            icon: "circle-question",
        },
        StarterPrompt {
            label: "מעוניין/ת לקבוע הדגמה",
            prompt: "אני רוצה לקבוע הדגמה בבקשה",
            icon: "circle-question",
        },
    ]
}

impl WidgetOptions {
    pub fn new(scheme: ColorScheme, attachments_enabled: bool) -> Self {
        Self {
            theme: theme_config(scheme),
            start_screen: StartScreen {
                greeting: GREETING,
                prompts: starter_prompts(),
            },
            composer: ComposerOption {
                placeholder: PLACEHOLDER_INPUT,
                attachments: Attachments {
                    enabled: attachments_enabled,
                },
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
