use fluent_bundle::{FluentArgs, FluentBundle, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;

/// Fluent-based localizer over the built-in `.ftl` resources (see ../i18n).
pub struct FluentLoc {
    bundle: FluentBundle<FluentResource>,
}

impl FluentLoc {
    pub fn builtin(lang: &str) -> Self {
        let langid: LanguageIdentifier = lang.parse().unwrap_or_default();

        let ftl_src = match lang {
            "en-GB" | "en" => include_str!("../i18n/en-GB.ftl"),
            _ => include_str!("../i18n/en-GB.ftl"),
        };

        // A resource with syntax errors still carries every entry that parsed.
        let res = FluentResource::try_new(ftl_src.to_owned()).unwrap_or_else(|(res, errs)| {
            tracing::warn!(?errs, "built-in FTL resource has errors");
            res
        });

        let mut bundle = FluentBundle::new(vec![langid]);
        // Plain terminal output: no bidi isolation marks around arguments.
        bundle.set_use_isolating(false);
        if let Err(errs) = bundle.add_resource(res) {
            tracing::warn!(?errs, "failed to add FTL resource");
        }
        Self { bundle }
    }

    /// Format a message by code with named args (("name","value"), ...).
    /// Returns the code itself if not found.
    pub fn msg(&self, code: &str, args: &[(&str, &str)]) -> String {
        let Some(msg) = self.bundle.get_message(code) else {
            return code.to_string();
        };
        let Some(pattern) = msg.value() else {
            return code.to_string();
        };

        let mut fa = FluentArgs::new();
        for (k, v) in args {
            fa.set(*k, FluentValue::from(*v));
        }

        let mut errs = vec![];
        let s = self.bundle.format_pattern(pattern, Some(&fa), &mut errs).to_string();

        if errs.is_empty() {
            s
        } else {
            code.to_string()
        }
    }
}

impl Default for FluentLoc {
    fn default() -> Self {
        Self::builtin("en-GB")
    }
}
