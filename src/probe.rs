//! Headless probe: runs a preview document's inline scripts in Boa against a
//! small mock DOM, so the isolation contract can be checked without a browser.
//!
//! The document is parsed with `scraper`; its element tree, `<base href>` and
//! title are handed to `probe_harness.js`, which provides `window`,
//! `document`, `location`, `history`, events and virtual-time timers. Inline
//! scripts then run in document order. As in a browser, a throwing script is
//! recorded and the next one still runs.

use crate::{Error, RenderedDocument, Result};
use boa_engine::{Context, Source};
use log::{debug, warn};
use scraper::{ElementRef, Html};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const HARNESS: &str = include_str!("probe_harness.js");

/// Probe configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Address the document is loaded at (sandboxed `srcdoc` frames report
    /// `about:srcdoc`)
    pub url: String,
    /// Fragment present on the initial URL, with or without the leading `#`
    pub initial_hash: Option<String>,
    /// Maximum loop iterations before Boa throws (0 => disabled)
    pub script_loop_iteration_limit: u64,
    /// Maximum recursion depth before Boa throws (usize::MAX => disabled)
    pub script_recursion_limit: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: "about:srcdoc".to_string(),
            initial_hash: None,
            script_loop_iteration_limit: 1_000_000,
            script_recursion_limit: 1024,
        }
    }
}

impl ProbeConfig {
    /// Initial address including `initial_hash`, if set.
    pub fn start_url(&self) -> String {
        match self.initial_hash.as_deref().map(|h| h.trim_start_matches('#')) {
            Some(h) if !h.is_empty() => {
                let base = self.url.split('#').next().unwrap_or_default();
                format!("{}#{}", base, h)
            }
            _ => self.url.clone(),
        }
    }
}

/// Result of evaluating a script in the probe
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptResult {
    /// Display form of the completion value (or the thrown error)
    pub value: String,
    /// Whether the script threw
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeLocation {
    pub href: String,
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

/// One `scrollIntoView` call observed in the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollRecord {
    pub id: String,
    pub tag: String,
    pub behavior: String,
    pub block: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub level: String,
    pub text: String,
}

/// Snapshot of everything the probe observed so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub location: ProbeLocation,
    pub scrolls: Vec<ScrollRecord>,
    /// Navigations that would have left the current document
    pub navigations: Vec<String>,
    pub history_length: u32,
    pub errors: Vec<String>,
    pub console: Vec<ConsoleEntry>,
    /// Virtual time elapsed since load, in milliseconds
    pub elapsed_ms: u64,
    pub pending_timers: u32,
}

#[derive(Serialize)]
struct ElementData {
    tag: String,
    id: String,
    text: String,
    attributes: Vec<(String, String)>,
    parent: Option<usize>,
}

struct InlineScript {
    index: usize,
    code: String,
}

struct PageModel {
    elements: Vec<ElementData>,
    scripts: Vec<InlineScript>,
    base_href: Option<String>,
    title: String,
}

fn is_javascript(type_attr: Option<&str>) -> bool {
    match type_attr.map(|t| t.trim().to_ascii_lowercase()) {
        None => true,
        Some(t) => matches!(t.as_str(), "" | "text/javascript" | "application/javascript" | "module"),
    }
}

fn extract_page(markup: &str) -> PageModel {
    let document = Html::parse_document(markup);
    let mut elements = Vec::new();
    let mut scripts = Vec::new();
    let mut base_href = None;
    let mut title = None;

    // Depth-first, children pushed in reverse so indices follow document order.
    let root = document.root_element();
    let mut stack: Vec<(ElementRef, Option<usize>)> = vec![(root, None)];
    while let Some((node, parent_idx)) = stack.pop() {
        let el = node.value();
        let tag = el.name().to_string();
        let text = node.text().collect::<String>();

        match tag.as_str() {
            "script" => {
                if el.attr("src").is_some() {
                    debug!("skipping external script {:?}", el.attr("src"));
                } else if is_javascript(el.attr("type")) {
                    scripts.push(InlineScript {
                        index: scripts.len(),
                        code: text.clone(),
                    });
                }
            }
            "base" if base_href.is_none() => {
                base_href = el.attr("href").map(|h| h.to_string());
            }
            "title" if title.is_none() => {
                title = Some(text.clone());
            }
            _ => {}
        }

        let idx = elements.len();
        elements.push(ElementData {
            tag,
            id: el.attr("id").map(|s| s.to_string()).unwrap_or_default(),
            text,
            attributes: el.attrs().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            parent: parent_idx,
        });

        let children: Vec<_> = node.children().filter_map(ElementRef::wrap).collect();
        for child in children.into_iter().rev() {
            stack.push((child, Some(idx)));
        }
    }

    PageModel {
        elements,
        scripts,
        base_href,
        title: title.unwrap_or_default(),
    }
}

// Substitutes each token once, left to right; inserted values are never
// rescanned, so page content that happens to contain a token stays intact.
fn fill_template(template: &str, tokens: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() + tokens.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;
    loop {
        let next = tokens
            .iter()
            .filter_map(|(tok, val)| rest.find(tok).map(|at| (at, *tok, val)))
            .min_by_key(|(at, _, _)| *at);
        match next {
            Some((at, tok, val)) => {
                out.push_str(&rest[..at]);
                out.push_str(val);
                rest = &rest[at + tok.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::ScriptError(format!("failed to serialize page model: {}", e)))
}

/// A loaded preview document running in an isolated Boa context.
///
/// Every probe owns its own context; nothing carries over between probes,
/// matching a frame that is reloaded for each render.
pub struct PreviewProbe {
    ctx: Context,
    config: ProbeConfig,
    load_errors: Vec<String>,
    scripts_run: usize,
}

impl PreviewProbe {
    /// Load a composed document.
    pub fn load(doc: &RenderedDocument, config: ProbeConfig) -> Result<Self> {
        Self::load_markup(doc.as_str(), config)
    }

    /// Load arbitrary markup (e.g. a page without the isolator, for
    /// comparison).
    pub fn load_markup(markup: &str, config: ProbeConfig) -> Result<Self> {
        let page = extract_page(markup);
        let harness = fill_template(
            HARNESS,
            &[
                ("__RFOX_ELEMENTS__", to_json(&page.elements)?),
                ("__RFOX_URL__", to_json(&config.start_url())?),
                ("__RFOX_BASE__", to_json(&page.base_href)?),
                ("__RFOX_TITLE__", to_json(&page.title)?),
            ],
        );

        let mut ctx = Context::default();
        if config.script_loop_iteration_limit > 0 {
            ctx.runtime_limits_mut().set_loop_iteration_limit(config.script_loop_iteration_limit);
        }
        if config.script_recursion_limit < usize::MAX {
            ctx.runtime_limits_mut().set_recursion_limit(config.script_recursion_limit);
        }

        ctx.eval(Source::from_bytes(harness.as_bytes()))
            .map_err(|e| Error::ScriptError(format!("probe harness failed: {}", e)))?;

        let mut probe = Self {
            ctx,
            config,
            load_errors: Vec::new(),
            scripts_run: 0,
        };

        for script in &page.scripts {
            if let Err(e) = probe.ctx.eval(Source::from_bytes(script.code.as_bytes())) {
                let message = format!("script #{} threw: {}", script.index, e);
                warn!("{}", message);
                probe.load_errors.push(message);
            }
            probe.scripts_run += 1;
        }

        probe
            .ctx
            .eval(Source::from_bytes("__rfox.finishLoad()".as_bytes()))
            .map_err(|e| Error::ScriptError(format!("load events failed: {}", e)))?;

        debug!(
            "probe loaded {} ({} elements, {} scripts)",
            probe.config.start_url(),
            page.elements.len(),
            probe.scripts_run
        );
        Ok(probe)
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Number of inline scripts executed during load.
    pub fn scripts_run(&self) -> usize {
        self.scripts_run
    }

    /// Evaluate a script in the page context.
    pub fn eval(&mut self, script: &str) -> ScriptResult {
        match self.ctx.eval(Source::from_bytes(script.as_bytes())) {
            Ok(val) => ScriptResult {
                value: format!("{}", val.display()),
                is_error: false,
            },
            Err(e) => ScriptResult {
                value: format!("Script thrown: {}", e),
                is_error: true,
            },
        }
    }

    fn eval_json<T: DeserializeOwned>(&mut self, expr: &str) -> Result<T> {
        let code = format!("JSON.stringify({})", expr);
        let value = self
            .ctx
            .eval(Source::from_bytes(code.as_bytes()))
            .map_err(|e| Error::ScriptError(e.to_string()))?;
        let text = value
            .to_string(&mut self.ctx)
            .map_err(|e| Error::ScriptError(e.to_string()))?
            .to_std_string_escaped();
        serde_json::from_str(&text).map_err(|e| Error::ScriptError(format!("malformed harness output: {}", e)))
    }

    /// Click the element with `id`, bubbling through its ancestors.
    ///
    /// Returns `true` when no listener cancelled the click (the default
    /// action, following the link, was performed).
    pub fn click(&mut self, id: &str) -> Result<bool> {
        let code = format!("__rfox.click({})", to_json(id)?);
        let value = self
            .ctx
            .eval(Source::from_bytes(code.as_bytes()))
            .map_err(|e| Error::ScriptError(format!("click failed: {}", e)))?;
        Ok(value.to_boolean())
    }

    /// Advance virtual time, running every timer that comes due.
    pub fn advance(&mut self, ms: u64) -> Result<()> {
        let code = format!("__rfox.advance({})", ms);
        self.ctx
            .eval(Source::from_bytes(code.as_bytes()))
            .map_err(|e| Error::ScriptError(format!("advance failed: {}", e)))?;
        Ok(())
    }

    pub fn report(&mut self) -> Result<ProbeReport> {
        let mut report: ProbeReport = self.eval_json("__rfox.report()")?;
        let mut errors = self.load_errors.clone();
        errors.append(&mut report.errors);
        report.errors = errors;
        Ok(report)
    }

    pub fn location(&mut self) -> Result<ProbeLocation> {
        Ok(self.report()?.location)
    }

    pub fn scrolls(&mut self) -> Result<Vec<ScrollRecord>> {
        Ok(self.report()?.scrolls)
    }

    pub fn navigations(&mut self) -> Result<Vec<String>> {
        Ok(self.report()?.navigations)
    }

    pub fn history_length(&mut self) -> Result<u32> {
        Ok(self.report()?.history_length)
    }

    /// Errors thrown by page scripts, at load or from listeners and timers.
    pub fn script_errors(&mut self) -> Result<Vec<String>> {
        Ok(self.report()?.errors)
    }

    /// Global names defined by the page beyond the harness's own.
    pub fn new_globals(&mut self) -> Result<Vec<String>> {
        self.eval_json("__rfox.newGlobals()")
    }
}
