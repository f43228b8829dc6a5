//! In-page JavaScript used by the Chromium provider.
//!
//! Every script is a self-contained IIFE that re-runs the selector query
//! and returns an object with a `status` field (`ok`, `missing`, `blocked`,
//! `invalid`). [`interpret`] turns that status into a [`ProviderError`].

use serde_json::{json, Value};
use twizz_core_types::{ElementLocator, ProviderError, ProviderErrorKind, SelectorStrategy};

const PRELUDE: &str = r#"
const __twizzNorm = (s) => (s || '').replace(/\s+/g, ' ').trim();
const __twizzMatch = (candidate, wanted, exact) => {
  const c = __twizzNorm(candidate);
  const w = __twizzNorm(wanted);
  return exact ? c === w : c.toLowerCase().includes(w.toLowerCase());
};
const __twizzRole = (el) => {
  const explicit = el.getAttribute('role');
  if (explicit) return explicit.split(' ')[0].toLowerCase();
  const tag = el.tagName.toLowerCase();
  const type = (el.getAttribute('type') || '').toLowerCase();
  switch (tag) {
    case 'button': return 'button';
    case 'a': return el.hasAttribute('href') ? 'link' : null;
    case 'img': return 'img';
    case 'select': return el.multiple ? 'listbox' : 'combobox';
    case 'textarea': return 'textbox';
    case 'h1': case 'h2': case 'h3': case 'h4': case 'h5': case 'h6': return 'heading';
    case 'li': return 'listitem';
    case 'ul': case 'ol': return 'list';
    case 'dialog': return 'dialog';
    case 'nav': return 'navigation';
    case 'input':
      if (['button', 'submit', 'reset', 'image'].includes(type)) return 'button';
      if (type === 'checkbox') return 'checkbox';
      if (type === 'radio') return 'radio';
      if (type === 'file' || type === 'hidden') return null;
      return 'textbox';
  }
  return null;
};
const __twizzName = (el) => {
  const aria = el.getAttribute('aria-label');
  if (aria) return aria;
  const labelledBy = el.getAttribute('aria-labelledby');
  if (labelledBy) {
    const text = labelledBy.split(/\s+/)
      .map((id) => { const ref = document.getElementById(id); return ref ? ref.textContent : ''; })
      .join(' ');
    if (__twizzNorm(text)) return text;
  }
  if (el.tagName === 'IMG' || el.tagName === 'AREA') {
    const alt = el.getAttribute('alt');
    if (alt) return alt;
  }
  if (el.tagName === 'INPUT' || el.tagName === 'TEXTAREA' || el.tagName === 'SELECT') {
    if (el.labels && el.labels.length) return Array.from(el.labels).map((l) => l.textContent).join(' ');
    const type = (el.getAttribute('type') || '').toLowerCase();
    if (['button', 'submit', 'reset'].includes(type)) return el.value;
    const placeholder = el.getAttribute('placeholder');
    if (placeholder) return placeholder;
  }
  const text = el.innerText !== undefined ? el.innerText : el.textContent;
  if (__twizzNorm(text)) return text;
  return el.getAttribute('title') || '';
};
const __twizzOrder = (list) => list.sort((a, b) =>
  a.compareDocumentPosition(b) & Node.DOCUMENT_POSITION_FOLLOWING ? -1 : 1);
const __twizzQuery = (root, spec) => {
  switch (spec.kind) {
    case 'css':
      return Array.from(root.querySelectorAll(spec.selector));
    case 'xpath': {
      const snap = document.evaluate(spec.expression, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
      const out = [];
      for (let i = 0; i < snap.snapshotLength; i++) {
        const node = snap.snapshotItem(i);
        if (node.nodeType === Node.ELEMENT_NODE) out.push(node);
      }
      return out;
    }
    case 'role':
      return Array.from(root.querySelectorAll('*')).filter((el) =>
        __twizzRole(el) === spec.role.toLowerCase() &&
        (spec.name === null || __twizzMatch(__twizzName(el), spec.name, spec.exact)));
    case 'text': {
      const hits = Array.from(root.querySelectorAll('*')).filter((el) =>
        !['SCRIPT', 'STYLE', 'HEAD', 'TITLE', 'NOSCRIPT'].includes(el.tagName) &&
        __twizzMatch(el.textContent, spec.text, spec.exact));
      return hits.filter((el) => !hits.some((other) => other !== el && el.contains(other)));
    }
    case 'relative': {
      const out = [];
      for (const parent of __twizzQuery(root, spec.parent)) {
        for (const child of __twizzQuery(parent, spec.child)) {
          if (!out.includes(child)) out.push(child);
        }
      }
      return __twizzOrder(out);
    }
  }
  throw new Error('unknown selector kind ' + spec.kind);
};
const __twizzVisible = (el) => {
  if (!el.isConnected) return false;
  const style = window.getComputedStyle(el);
  if (style.visibility === 'hidden' || style.display === 'none') return false;
  const rect = el.getBoundingClientRect();
  return rect.width > 0 && rect.height > 0;
};
const __twizzEnabled = (el) => !(el.disabled === true || el.getAttribute('aria-disabled') === 'true');
const __twizzPick = (spec, index) => {
  let all;
  try {
    all = __twizzQuery(document, spec);
  } catch (err) {
    return { status: 'invalid', reason: String(err && err.message ? err.message : err) };
  }
  if (index >= all.length) return { status: 'missing', reason: 'matched ' + all.length + ' elements' };
  return { status: 'ok', el: all[index] };
};
"#;

/// JSON form of a strategy consumed by the prelude's `__twizzQuery`.
pub fn strategy_spec(strategy: &SelectorStrategy) -> Value {
    spec_in(strategy, false)
}

/// `scoped` strategies run with a matched parent as the query root.
fn spec_in(strategy: &SelectorStrategy, scoped: bool) -> Value {
    match strategy {
        SelectorStrategy::Role { role, name, exact } => json!({
            "kind": "role",
            "role": role,
            "name": name,
            "exact": exact,
        }),
        SelectorStrategy::Text { text, exact } => json!({
            "kind": "text",
            "text": text,
            "exact": exact,
        }),
        SelectorStrategy::Css(selector) => json!({ "kind": "css", "selector": selector }),
        SelectorStrategy::XPath(expression) => {
            let expression = if scoped {
                context_relative(expression)
            } else {
                expression.clone()
            };
            json!({ "kind": "xpath", "expression": expression })
        }
        SelectorStrategy::Relative { parent, child } => json!({
            "kind": "relative",
            "parent": spec_in(parent, scoped),
            "child": spec_in(child, true),
        }),
    }
}

/// Anchor an absolute XPath at the context node, so `//li` becomes `.//li`.
///
/// A leading `(` group is anchored inside the parenthesis.
fn context_relative(expression: &str) -> String {
    let trimmed = expression.trim_start();
    let (open, rest) = match trimmed.strip_prefix('(') {
        Some(rest) => ("(", rest.trim_start()),
        None => ("", trimmed),
    };
    if rest.starts_with('/') {
        format!("{}.{}", open, rest)
    } else {
        trimmed.to_string()
    }
}

fn wrap(body: &str) -> String {
    let mut script = String::with_capacity(PRELUDE.len() + body.len() + 32);
    script.push_str("(() => {");
    script.push_str(PRELUDE);
    script.push_str(body);
    script.push_str("\n})()");
    script
}

fn pick(locator: &ElementLocator) -> String {
    format!(
        "const __picked = __twizzPick({}, {});\nif (__picked.status !== 'ok') return __picked;\nconst el = __picked.el;\n",
        strategy_spec(&locator.strategy),
        locator.index
    )
}

pub fn count(strategy: &SelectorStrategy) -> String {
    wrap(&format!(
        "try {{\n  return {{ status: 'ok', count: __twizzQuery(document, {}).length }};\n}} catch (err) {{\n  return {{ status: 'invalid', reason: String(err && err.message ? err.message : err) }};\n}}",
        strategy_spec(strategy)
    ))
}

/// Snapshot script; a missing element yields `status: 'ok'` with `attached: false`.
pub fn snapshot(locator: &ElementLocator) -> String {
    wrap(&format!(
        "const __picked = __twizzPick({}, {});\nif (__picked.status === 'missing') return {{ status: 'ok', attached: false }};\nif (__picked.status !== 'ok') return __picked;\nconst el = __picked.el;\nreturn {{ status: 'ok', attached: true, visible: __twizzVisible(el), enabled: __twizzEnabled(el) }};",
        strategy_spec(&locator.strategy),
        locator.index
    ))
}

/// Scroll the element into view and return its centre in viewport
/// coordinates. Unless `force` is set the element must be visible, enabled
/// and the topmost node at that point.
pub fn pointer_target(locator: &ElementLocator, force: bool) -> String {
    let mut body = pick(locator);
    body.push_str("el.scrollIntoView({ block: 'center', inline: 'center' });\n");
    body.push_str("const rect = el.getBoundingClientRect();\n");
    body.push_str("const x = rect.left + rect.width / 2;\nconst y = rect.top + rect.height / 2;\n");
    if !force {
        body.push_str(
            r#"if (!__twizzVisible(el)) return { status: 'blocked', reason: 'element is not visible' };
if (!__twizzEnabled(el)) return { status: 'blocked', reason: 'element is disabled' };
const top = document.elementFromPoint(x, y);
if (top && top !== el && !el.contains(top)) {
  const desc = top.tagName.toLowerCase() + (top.id ? '#' + top.id : '') +
    (typeof top.className === 'string' && top.className ? '.' + top.className.trim().split(/\s+/).join('.') : '');
  return { status: 'blocked', reason: desc + ' intercepts pointer events' };
}
"#,
        );
    }
    body.push_str("return { status: 'ok', x, y };");
    wrap(&body)
}

pub fn dispatch_click(locator: &ElementLocator) -> String {
    let mut body = pick(locator);
    body.push_str("el.click();\nreturn { status: 'ok' };");
    wrap(&body)
}

/// Replace the element's value through the native setter and fire
/// `input` and `change`.
pub fn fill(locator: &ElementLocator, text: &str, force: bool) -> String {
    let mut body = pick(locator);
    if !force {
        body.push_str(
            r#"if (!__twizzVisible(el)) return { status: 'blocked', reason: 'element is not visible' };
if (!__twizzEnabled(el)) return { status: 'blocked', reason: 'element is disabled' };
if (el.readOnly) return { status: 'blocked', reason: 'element is read-only' };
"#,
        );
    }
    body.push_str(&format!(
        r#"const value = {};
el.focus();
if (el.isContentEditable) {{
  el.textContent = value;
}} else {{
  const proto = el instanceof HTMLTextAreaElement ? HTMLTextAreaElement.prototype
    : el instanceof HTMLSelectElement ? HTMLSelectElement.prototype
    : HTMLInputElement.prototype;
  const setter = Object.getOwnPropertyDescriptor(proto, 'value');
  if (setter && setter.set) {{ setter.set.call(el, value); }} else {{ el.value = value; }}
}}
el.dispatchEvent(new Event('input', {{ bubbles: true }}));
el.dispatchEvent(new Event('change', {{ bubbles: true }}));
return {{ status: 'ok' }};"#,
        Value::String(text.to_string())
    ));
    wrap(&body)
}

pub fn read_attribute(locator: &ElementLocator, name: &str) -> String {
    let mut body = pick(locator);
    body.push_str(&format!(
        "return {{ status: 'ok', value: el.getAttribute({}) }};",
        Value::String(name.to_string())
    ));
    wrap(&body)
}

/// Tag the element with a unique attribute so a CSS query can reach it
/// from outside the page (file inputs need a DOM node handle).
pub fn mark(locator: &ElementLocator, token: &str) -> String {
    let mut body = pick(locator);
    body.push_str(&format!(
        "el.setAttribute('{}', {});\nreturn {{ status: 'ok' }};",
        MARK_ATTRIBUTE,
        Value::String(token.to_string())
    ));
    wrap(&body)
}

pub const MARK_ATTRIBUTE: &str = "data-twizz-mark";

pub fn scroll_into_view(locator: &ElementLocator) -> String {
    let mut body = pick(locator);
    body.push_str("el.scrollIntoView({ block: 'center', inline: 'center' });\nreturn { status: 'ok' };");
    wrap(&body)
}

/// Map a script result onto the provider error taxonomy.
pub fn interpret(value: Value) -> Result<Value, ProviderError> {
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let reason = value
        .get("reason")
        .and_then(Value::as_str)
        .map(str::to_string);
    let with_reason = |kind: ProviderErrorKind| match &reason {
        Some(reason) => ProviderError::new(kind).with_hint(reason.clone()),
        None => ProviderError::new(kind),
    };
    match status.as_str() {
        "ok" => Ok(value),
        "missing" => Err(with_reason(ProviderErrorKind::TargetNotFound)),
        "blocked" => Err(with_reason(ProviderErrorKind::NotActionable)),
        "invalid" => Err(with_reason(ProviderErrorKind::InvalidSelector)),
        other => Err(ProviderError::new(ProviderErrorKind::Internal)
            .with_hint(format!("unexpected script status '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_spec_nests_relative_selectors() {
        let strategy = SelectorStrategy::any_role("button").within(SelectorStrategy::css(".tile"));
        let spec = strategy_spec(&strategy);
        assert_eq!(spec["kind"], "relative");
        assert_eq!(spec["parent"]["selector"], ".tile");
        assert_eq!(spec["child"]["role"], "button");
        assert!(spec["child"]["name"].is_null());
    }

    #[test]
    fn child_xpath_is_anchored_at_the_parent() {
        let strategy = SelectorStrategy::xpath("//li[@data-kind='tile']")
            .within(SelectorStrategy::xpath("//ul[@id='saved']"));
        let spec = strategy_spec(&strategy);
        assert_eq!(spec["parent"]["expression"], "//ul[@id='saved']");
        assert_eq!(spec["child"]["expression"], ".//li[@data-kind='tile']");

        let grouped = SelectorStrategy::xpath("(//button)[last()]").within(SelectorStrategy::css(".tile"));
        assert_eq!(strategy_spec(&grouped)["child"]["expression"], "(.//button)[last()]");

        let already_relative = SelectorStrategy::xpath("./span").within(SelectorStrategy::css(".tile"));
        assert_eq!(strategy_spec(&already_relative)["child"]["expression"], "./span");
    }

    #[test]
    fn nested_relative_parents_are_scoped_too() {
        let inner = SelectorStrategy::text("Delete").within(SelectorStrategy::xpath("/div"));
        let strategy = inner.within(SelectorStrategy::css(".list"));
        let spec = strategy_spec(&strategy);
        assert_eq!(spec["child"]["parent"]["expression"], "./div");
        assert_eq!(spec["child"]["child"]["text"], "Delete");
    }

    #[test]
    fn user_text_is_json_escaped() {
        let locator = ElementLocator::new(SelectorStrategy::css("input"), 0);
        let script = fill(&locator, "it's \"quoted\"\n</script>", false);
        assert!(script.contains(r#"const value = "it's \"quoted\"\n</script>";"#));
        assert!(script.starts_with("(() => {"));
        assert!(script.ends_with("})()"));
    }

    #[test]
    fn force_skips_actionability_checks() {
        let locator = ElementLocator::new(SelectorStrategy::text("Save"), 1);
        assert!(pointer_target(&locator, false).contains("intercepts pointer events"));
        assert!(!pointer_target(&locator, true).contains("intercepts pointer events"));
        let script = pointer_target(&locator, true);
        assert!(script.contains("\"kind\":\"text\""));
        assert!(script.contains("\"text\":\"Save\"}, 1)") || script.contains("\"exact\":false}, 1)"));
    }

    #[test]
    fn interpret_maps_statuses() {
        assert!(interpret(json!({"status": "ok", "count": 2})).is_ok());
        let err = interpret(json!({"status": "blocked", "reason": "div.overlay intercepts pointer events"}))
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::NotActionable);
        assert_eq!(err.hint.as_deref(), Some("div.overlay intercepts pointer events"));
        assert_eq!(
            interpret(json!({"status": "missing"})).unwrap_err().kind,
            ProviderErrorKind::TargetNotFound
        );
        assert_eq!(
            interpret(json!({"status": "invalid", "reason": "bad"})).unwrap_err().kind,
            ProviderErrorKind::InvalidSelector
        );
        assert_eq!(
            interpret(json!(null)).unwrap_err().kind,
            ProviderErrorKind::Internal
        );
    }
}
