//! Canonical JSON output and the HTML table generated from it.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::BufferError;
use crate::models::{Listing, Origin};

pub const DEFAULT_ROWS_PER_PAGE: usize = 15;

struct Column {
    key: &'static str,
    label: &'static str,
    sortable: bool,
}

const COLUMNS: [Column; 11] = [
    Column { key: "link", label: "LINK", sortable: false },
    Column { key: "title", label: "TITULO", sortable: false },
    Column { key: "price", label: "ALUGUEL", sortable: true },
    Column { key: "iptu", label: "IPTU", sortable: true },
    Column { key: "condominio", label: "CONDOMINIO", sortable: true },
    Column { key: "totalPrice", label: "TOTAL", sortable: true },
    Column { key: "area", label: "AREA", sortable: true },
    Column { key: "bedrooms", label: "QUARTO", sortable: true },
    Column { key: "bathrooms", label: "BANHEIRO", sortable: true },
    Column { key: "location", label: "LOCALIZACAO", sortable: false },
    Column { key: "datePosted", label: "DATA ANUNCIO", sortable: false },
];

const STYLE: &str = r#"
  body { font-family: Arial, sans-serif; padding: 20px; }
  table { border-collapse: collapse; width: 100%; }
  tr { height: 50px; }
  th, td { border: 1px solid #ddd; padding: 8px; }
  th { background-color: #f2f2f2; user-select: none; }
  th.sortable { cursor: pointer; }
  th.sortable:hover { background-color: #ddd; }
  th.asc::after { content: " ▲"; }
  th.desc::after { content: " ▼"; }
  .pagination { margin-top: 10px; }
  .pagination button { padding: 6px 12px; margin-right: 4px; }
  .row-dark { background-color: #f2f2f2; }
"#;

const SCRIPT: &str = r#"
  const data = JSON.parse(document.getElementById('listings').textContent);
  const rowsPerPage = Number(document.getElementById('propertiesTable').dataset.rowsPerPage);
  const money = new Intl.NumberFormat('pt-BR', { style: 'currency', currency: 'BRL' });
  let currentPage = 1;
  let sortKey = null;
  let sortAsc = true;

  function escapeHtml(value) {
    return String(value).replace(/[&<>"']/g, (c) => ({
      '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;'
    })[c]);
  }

  function renderTable() {
    const rows = [...data];
    if (sortKey) {
      rows.sort((a, b) => sortAsc ? a[sortKey] - b[sortKey] : b[sortKey] - a[sortKey]);
    }
    const start = (currentPage - 1) * rowsPerPage;
    document.getElementById('tableBody').innerHTML = rows
      .slice(start, start + rowsPerPage)
      .map((item, i) => `
        <tr class="${i % 2 === 0 ? '' : 'row-dark'}">
          <td><a href="${escapeHtml(item.link)}" target="_blank" rel="noopener noreferrer">${escapeHtml(item.origin.substring(0, 3))}</a></td>
          <td>${escapeHtml(item.title)}</td>
          <td>${money.format(item.price)}</td>
          <td>${money.format(item.iptu)}</td>
          <td>${money.format(item.condominio)}</td>
          <td>${money.format(item.totalPrice)}</td>
          <td>${item.area}</td>
          <td>${item.bedrooms}</td>
          <td>${item.bathrooms}</td>
          <td>${escapeHtml(item.location)}</td>
          <td>${escapeHtml(item.datePosted)}</td>
        </tr>`)
      .join('');
    renderPagination(rows.length);
    document.querySelectorAll('th.sortable').forEach((th) => {
      th.classList.remove('asc', 'desc');
      if (th.dataset.key === sortKey) th.classList.add(sortAsc ? 'asc' : 'desc');
    });
  }

  function button(label, disabled, onClick) {
    const btn = document.createElement('button');
    btn.textContent = label;
    btn.disabled = disabled;
    btn.onclick = onClick;
    return btn;
  }

  function renderPagination(total) {
    const pages = Math.ceil(total / rowsPerPage);
    const container = document.getElementById('paginationControls');
    container.innerHTML = '';
    if (pages <= 1) return;
    const go = (page) => () => { currentPage = page; renderTable(); };
    container.appendChild(button('Prev', currentPage === 1, go(currentPage - 1)));
    for (let i = Math.max(1, currentPage - 3); i <= Math.min(pages, currentPage + 3); i++) {
      container.appendChild(button(String(i), i === currentPage, go(i)));
    }
    container.appendChild(button('Next', currentPage === pages, go(currentPage + 1)));
  }

  document.querySelectorAll('th.sortable').forEach((th) => {
    th.addEventListener('click', () => {
      if (sortKey === th.dataset.key) {
        sortAsc = !sortAsc;
      } else {
        sortKey = th.dataset.key;
        sortAsc = true;
      }
      currentPage = 1;
      renderTable();
    });
  });

  renderTable();
"#;

/// Escapes text for HTML element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Serializes `listings` for embedding inside a `<script>` element.
///
/// `<` only ever occurs inside JSON strings, so writing it as `\u003c`
/// keeps the data intact while ruling out `</script>` and `<!--`.
fn script_json(listings: &[Listing]) -> serde_json::Result<String> {
    Ok(serde_json::to_string(listings)?.replace('<', "\\u003c"))
}

/// Origins in order of first appearance.
fn origins(listings: &[Listing]) -> Vec<Origin> {
    let mut seen = Vec::new();
    for listing in listings {
        if !seen.contains(&listing.origin()) {
            seen.push(listing.origin());
        }
    }
    seen
}

/// Self-contained, paginated and sortable HTML table of listings.
#[derive(Debug, Clone, Copy)]
pub struct HtmlTableRenderer {
    rows_per_page: usize,
}

impl Default for HtmlTableRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS_PER_PAGE)
    }
}

impl HtmlTableRenderer {
    pub fn new(rows_per_page: usize) -> Self {
        Self {
            rows_per_page: rows_per_page.max(1),
        }
    }

    pub fn render(&self, listings: &[Listing], generated_at: DateTime<Utc>) -> serde_json::Result<String> {
        let origins = origins(listings)
            .iter()
            .map(|origin| origin.tag())
            .collect::<Vec<_>>()
            .join(", ");

        let mut headers = String::new();
        for column in &COLUMNS {
            if column.sortable {
                let _ = write!(headers, r#"<th class="sortable" data-key="{}">{}</th>"#, column.key, column.label);
            } else {
                let _ = write!(headers, "<th>{}</th>", column.label);
            }
        }

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="UTF-8" />
<meta name="viewport" content="width=device-width, initial-scale=1" />
<title>AGREGADOR ALUGUEL</title>
<style>{style}</style>
</head>
<body>
<h4>ORIGENS: {origins}</h4>
<p>{count} anúncios, gerado em {generated}</p>
<table id="propertiesTable" data-rows-per-page="{rows_per_page}">
  <thead><tr>{headers}</tr></thead>
  <tbody id="tableBody"></tbody>
</table>
<div class="pagination" id="paginationControls"></div>
<script type="application/json" id="listings">{data}</script>
<script>{script}</script>
</body>
</html>
"#,
            style = STYLE,
            origins = escape_html(&origins),
            count = listings.len(),
            generated = generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            rows_per_page = self.rows_per_page,
            headers = headers,
            data = script_json(listings)?,
            script = SCRIPT,
        ))
    }
}

/// Paths of one run's output files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub html: PathBuf,
}

/// Writes `result-<unix-ms>.json` and its HTML rendering into `output_dir`.
pub async fn write_outputs(
    output_dir: &Path,
    listings: &[Listing],
    renderer: &HtmlTableRenderer,
) -> Result<ReportPaths, BufferError> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| BufferError::io(output_dir, e))?;

    let now = Utc::now();
    let stem = format!("result-{}", now.timestamp_millis());
    let paths = ReportPaths {
        json: output_dir.join(format!("{stem}.json")),
        html: output_dir.join(format!("{stem}.html")),
    };

    let json = serde_json::to_string_pretty(listings).map_err(|e| BufferError::json(&paths.json, e))?;
    tokio::fs::write(&paths.json, json)
        .await
        .map_err(|e| BufferError::io(&paths.json, e))?;
    info!("💾 Saved {} listings to {}", listings.len(), paths.json.display());

    let html = renderer
        .render(listings, now)
        .map_err(|e| BufferError::json(&paths.html, e))?;
    tokio::fs::write(&paths.html, html)
        .await
        .map_err(|e| BufferError::io(&paths.html, e))?;
    info!("💾 Saved report to {}", paths.html.display());

    Ok(paths)
}
