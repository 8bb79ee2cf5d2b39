//! Theme palette and preview CSS emission.
//!
//! ThemeColors is the user-selected semantic palette, supplied per
//! generation and consumed only at document-assembly time. Colors are
//! registered as named utility-class tokens (never inline styles) so
//! generated class names like `bg-primary` resolve, and a curated keyframe
//! set is injected so generated code can reference named animations without
//! defining `@keyframes` itself.

use serde::{Deserialize, Serialize};

/// Six semantic color roles, as CSS color values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeColors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub surface: String,
    pub text: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        ThemeColors {
            primary: "#6366f1".to_string(),
            secondary: "#8b5cf6".to_string(),
            accent: "#ec4899".to_string(),
            background: "#0f172a".to_string(),
            surface: "#1e293b".to_string(),
            text: "#f1f5f9".to_string(),
        }
    }
}

impl ThemeColors {
    /// Role name → value pairs in fixed emission order.
    pub fn roles(&self) -> [(&'static str, &str); 6] {
        [
            ("primary", self.primary.as_str()),
            ("secondary", self.secondary.as_str()),
            ("accent", self.accent.as_str()),
            ("background", self.background.as_str()),
            ("surface", self.surface.as_str()),
            ("text", self.text.as_str()),
        ]
    }

    /// Utility-class color tokens for every role.
    pub fn utility_css(&self) -> String {
        let mut css = String::new();
        for (role, value) in self.roles() {
            css.push_str(&format!(".bg-{} {{ background-color: {}; }}\n", role, value));
            css.push_str(&format!(".text-{} {{ color: {}; }}\n", role, value));
            css.push_str(&format!(".border-{} {{ border-color: {}; }}\n", role, value));
        }
        css
    }
}

/// Keyframes + matching `animate-*` utility classes available to every
/// preview document. Kept small and deterministic.
pub fn animation_css() -> &'static str {
    "@keyframes fade-in { from { opacity: 0; } to { opacity: 1; } }\n\
     @keyframes slide-up { from { opacity: 0; transform: translateY(16px); } to { opacity: 1; transform: translateY(0); } }\n\
     @keyframes slide-in-right { from { opacity: 0; transform: translateX(24px); } to { opacity: 1; transform: translateX(0); } }\n\
     @keyframes scale-in { from { opacity: 0; transform: scale(0.95); } to { opacity: 1; transform: scale(1); } }\n\
     @keyframes float { 0%, 100% { transform: translateY(0); } 50% { transform: translateY(-8px); } }\n\
     @keyframes shimmer { from { background-position: -200% 0; } to { background-position: 200% 0; } }\n\
     .animate-fade-in { animation: fade-in 0.5s ease-out both; }\n\
     .animate-slide-up { animation: slide-up 0.5s ease-out both; }\n\
     .animate-slide-in-right { animation: slide-in-right 0.5s ease-out both; }\n\
     .animate-scale-in { animation: scale-in 0.3s ease-out both; }\n\
     .animate-float { animation: float 3s ease-in-out infinite; }\n\
     .animate-shimmer { animation: shimmer 2s linear infinite; }\n"
}
