//! Deterministic fallback apps, chosen from keywords in the brief.

use std::collections::BTreeMap;

use super::bundle::DecodedAttachment;
use crate::util::escape_html;

const SAMPLE_SALES_CSV: &str = "product,sales\nA,10\nB,20.5\n";
const SAMPLE_MARKDOWN: &str = "# Hello\n\nThis is **Markdown**.\n";

const SALES_SUMMARY_HTML: &str = r#"<!doctype html><html><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1">
<title>Sales Summary</title>
<link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" rel="stylesheet">
</head><body class="container p-4">
<h1>Sales Summary</h1>
<p>Total: <strong id="total-sales">0</strong></p>
<table id="product-sales" class="table table-striped d-none"><thead><tr><th>Product</th><th>Sales</th></tr></thead><tbody></tbody></table>
<script>
(async () => {
  const text = await fetch('data.csv').then(r => r.text());
  const rows = text.trim().split(/\n+/).slice(1).map(l => l.split(','));
  let sum = 0; const by = {};
  for (const [p, v] of rows) { const n = parseFloat(v); if (!isNaN(n)) { sum += n; by[p] = (by[p] || 0) + n; } }
  document.querySelector('#total-sales').textContent = sum.toFixed(2);
  const tbody = document.querySelector('#product-sales tbody');
  for (const [k, v] of Object.entries(by)) {
    const tr = document.createElement('tr');
    tr.innerHTML = `<td>${k}</td><td>${v.toFixed(2)}</td>`;
    tbody.appendChild(tr);
  }
  if (Object.keys(by).length) document.querySelector('#product-sales').classList.remove('d-none');
})();
</script></body></html>
"#;

const MARKDOWN_VIEWER_HTML: &str = r#"<!doctype html><html><head><meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Markdown Viewer</title>
<script src="https://cdn.jsdelivr.net/npm/marked/marked.min.js"></script>
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/styles/default.min.css">
<script src="https://cdnjs.cloudflare.com/ajax/libs/highlight.js/11.9.0/highlight.min.js"></script>
</head><body class="container p-4">
<h1>Markdown Viewer</h1><div id="markdown-output"></div>
<script>
(async () => {
  const url = new URLSearchParams(location.search).get('url') || 'input.md';
  const md = await fetch(url).then(r => r.text());
  document.querySelector('#markdown-output').innerHTML = marked.parse(md, {mangle: false, headerIds: false});
  document.querySelectorAll('pre code').forEach(el => hljs.highlightElement(el));
})();
</script></body></html>
"#;

/// Which fallback app a brief selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    SalesSummary,
    MarkdownViewer,
    Generic,
}

impl TemplateKind {
    pub fn for_brief(brief: &str) -> Self {
        let brief = brief.to_lowercase();
        if brief.contains("sum-of-sales") || (brief.contains("sales") && brief.contains("csv")) {
            TemplateKind::SalesSummary
        } else if brief.contains("markdown") {
            TemplateKind::MarkdownViewer
        } else {
            TemplateKind::Generic
        }
    }
}

/// Build the fallback app for `brief`. Sample data files are only added when
/// the request did not attach a file of the same name.
pub fn template_from_brief(
    brief: &str,
    attachments: &[DecodedAttachment],
) -> BTreeMap<String, Vec<u8>> {
    let attached = |name: &str| attachments.iter().any(|a| a.name == name);
    let mut files = BTreeMap::new();

    match TemplateKind::for_brief(brief) {
        TemplateKind::SalesSummary => {
            files.insert("index.html".to_string(), SALES_SUMMARY_HTML.as_bytes().to_vec());
            if !attached("data.csv") {
                files.insert("data.csv".to_string(), SAMPLE_SALES_CSV.as_bytes().to_vec());
            }
        }
        TemplateKind::MarkdownViewer => {
            files.insert("index.html".to_string(), MARKDOWN_VIEWER_HTML.as_bytes().to_vec());
            if !attached("input.md") {
                files.insert("input.md".to_string(), SAMPLE_MARKDOWN.as_bytes().to_vec());
            }
        }
        TemplateKind::Generic => {
            let html = format!(
                "<!doctype html><html><head><meta charset=\"utf-8\"><title>Generated App</title></head>\
                 <body><h1>Generated App</h1><pre>{}</pre></body></html>\n",
                escape_html(brief)
            );
            files.insert("index.html".to_string(), html.into_bytes());
        }
    }
    files
}
