//! Scripts evaluated inside the page. Each returns a JSON string so the result
//! crosses the protocol boundary as a single value.

/// Walks the rendered DOM in document order and returns the accessibility
/// tree as `{tree, truncated}`. `tree` holds `{role, name, description,
/// value, checked, selected, children}` nodes, or `null` when there is no
/// body; `truncated` is set when elements sat below the depth limit.
pub const ACCESSIBILITY_TREE_SCRIPT: &str = r#"
(() => {
    const MAX_DEPTH = 256;
    const MAX_TEXT = 100;
    let truncated = false;
    const SKIP = new Set(['script', 'style', 'noscript', 'template', 'meta', 'link', 'head', 'base']);
    const NAME_FROM_CONTENT = new Set([
        'button', 'link', 'heading', 'cell', 'columnheader', 'rowheader', 'listitem',
        'option', 'tab', 'menuitem', 'treeitem', 'paragraph', 'label', 'caption', 'term',
        'definition', 'tooltip', 'status', 'alert'
    ]);
    const IMPLICIT = {
        article: 'article', aside: 'complementary', button: 'button', caption: 'caption',
        dd: 'definition', details: 'group', dialog: 'dialog', dt: 'term', fieldset: 'group',
        figure: 'figure', footer: 'contentinfo', form: 'form', h1: 'heading', h2: 'heading',
        h3: 'heading', h4: 'heading', h5: 'heading', h6: 'heading', header: 'banner',
        hr: 'separator', iframe: 'iframe', img: 'img', label: 'label', legend: 'legend',
        li: 'listitem', main: 'main', menu: 'list', meter: 'meter', nav: 'navigation',
        ol: 'list', optgroup: 'group', option: 'option', output: 'status', p: 'paragraph',
        progress: 'progressbar', search: 'search', section: 'region', select: 'combobox',
        summary: 'button', table: 'table', tbody: 'rowgroup', td: 'cell', textarea: 'textbox',
        tfoot: 'rowgroup', th: 'columnheader', thead: 'rowgroup', tr: 'row', ul: 'list',
        svg: 'graphics-document'
    };
    const INPUT_ROLES = {
        button: 'button', checkbox: 'checkbox', email: 'textbox', image: 'button',
        number: 'spinbutton', radio: 'radio', range: 'slider', reset: 'button',
        search: 'searchbox', submit: 'button', tel: 'textbox', text: 'textbox', url: 'textbox'
    };

    const clean = (text) => (text || '').replace(/\s+/g, ' ').trim().substring(0, MAX_TEXT);

    const isHidden = (el) => {
        if (el.hidden || el.getAttribute('aria-hidden') === 'true') return true;
        const style = window.getComputedStyle(el);
        return style.display === 'none' || style.visibility === 'hidden';
    };

    const roleOf = (el, tag) => {
        const explicit = (el.getAttribute('role') || '').trim().split(/\s+/)[0];
        if (explicit) return explicit.toLowerCase();
        if (tag === 'a' || tag === 'area') return el.hasAttribute('href') ? 'link' : 'generic';
        if (tag === 'input') return INPUT_ROLES[(el.type || 'text').toLowerCase()] || 'textbox';
        return IMPLICIT[tag] || 'generic';
    };

    const textOfIds = (ids) => ids.split(/\s+/)
        .map((id) => document.getElementById(id))
        .filter(Boolean)
        .map((el) => el.textContent)
        .join(' ');

    const directText = (el) => Array.from(el.childNodes)
        .filter((n) => n.nodeType === Node.TEXT_NODE)
        .map((n) => n.textContent)
        .join(' ');

    const nameOf = (el, role) => {
        const labelledBy = el.getAttribute('aria-labelledby');
        if (el.getAttribute('aria-label')) return clean(el.getAttribute('aria-label'));
        if (labelledBy) {
            const text = clean(textOfIds(labelledBy));
            if (text) return text;
        }
        if (el.labels && el.labels.length > 0) return clean(el.labels[0].textContent);
        if (el.getAttribute('alt')) return clean(el.getAttribute('alt'));
        if (el.getAttribute('title')) return clean(el.getAttribute('title'));
        if (NAME_FROM_CONTENT.has(role)) {
            const text = clean(el.innerText || el.textContent);
            if (text) return text;
        } else {
            const text = clean(directText(el));
            if (text) return text;
        }
        if (el.getAttribute('placeholder')) return clean(el.getAttribute('placeholder'));
        if (el.tagName.toLowerCase() === 'input' && ['submit', 'button', 'reset'].includes(el.type)) {
            return clean(el.value);
        }
        return null;
    };

    const descriptionOf = (el) => {
        if (el.getAttribute('aria-description')) return clean(el.getAttribute('aria-description'));
        const describedBy = el.getAttribute('aria-describedby');
        return describedBy ? (clean(textOfIds(describedBy)) || null) : null;
    };

    const valueOf = (el, tag) => {
        if (tag === 'input') {
            const type = (el.type || 'text').toLowerCase();
            if (['password', 'hidden', 'checkbox', 'radio', 'submit', 'button', 'reset', 'image'].includes(type)) {
                return null;
            }
            return clean(el.value) || null;
        }
        if (tag === 'textarea' || tag === 'select') return clean(el.value) || null;
        return null;
    };

    const walk = (el, depth) => {
        const tag = el.tagName.toLowerCase();
        if (SKIP.has(tag) || isHidden(el)) return null;
        if (tag === 'input' && (el.type || '').toLowerCase() === 'hidden') return null;

        const role = roleOf(el, tag);
        const node = { role: role, name: nameOf(el, role), description: descriptionOf(el), children: [] };

        const value = valueOf(el, tag);
        if (value) node.value = value;
        if (role === 'checkbox' || role === 'radio' || role === 'switch') node.checked = !!el.checked;
        if (tag === 'option' && el.selected) node.selected = true;

        if (role === 'graphics-document') return node;
        if (depth >= MAX_DEPTH) {
            if (el.children.length > 0) truncated = true;
            return node;
        }
        for (const child of el.children) {
            const childNode = walk(child, depth + 1);
            if (childNode) node.children.push(childNode);
        }
        return node;
    };

    const root = document.body;
    if (!root) return JSON.stringify({ tree: null, truncated: false });
    const tree = walk(root, 0);
    if (tree && tree.role === 'generic') tree.role = 'document';
    return JSON.stringify({ tree: tree, truncated: truncated });
})()
"#;

/// Reports where navigation ended up: final URL, main-document HTTP status
/// (Navigation Timing level 2, when available), title and leading text.
pub const NAVIGATION_PROBE_SCRIPT: &str = r#"
(() => {
    let status = null;
    try {
        const entries = performance.getEntriesByType('navigation');
        if (entries.length > 0 && entries[0].responseStatus) status = entries[0].responseStatus;
    } catch (e) {}
    const body = document.body ? (document.body.innerText || '') : '';
    return JSON.stringify({
        url: window.location.href,
        status: status,
        title: document.title || '',
        textExcerpt: body.replace(/\s+/g, ' ').trim().substring(0, 1000),
        readyState: document.readyState
    });
})()
"#;

/// Resolves once `document.readyState` is `complete` or the page has been
/// interactive for a short grace period.
pub const WAIT_FOR_CONTENT_SCRIPT: &str = r#"
new Promise((resolve) => {
    if (document.readyState === 'complete') return resolve(true);
    let settled = false;
    const done = () => { if (!settled) { settled = true; resolve(true); } };
    window.addEventListener('load', done, { once: true });
    if (document.readyState === 'interactive') setTimeout(done, 2000);
    else document.addEventListener('DOMContentLoaded', () => setTimeout(done, 2000), { once: true });
})
"#;
