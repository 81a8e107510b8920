//! HTML rendering. All user-supplied text passes through [`escape`].

use std::collections::HashMap;

use rust_decimal::Decimal;

use stockledger_core::{ProductId, index_by_id};
use stockledger_infra::InventoryError;
use stockledger_inventory::{BalanceRow, DEFAULT_UNIT, MoveType, Movement, Product};

use super::{MovementForm, ProductForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Products,
    Movements,
    Balances,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Products, Tab::Movements, Tab::Balances];

    fn path(self) -> &'static str {
        match self {
            Tab::Products => "/ui/products",
            Tab::Movements => "/ui/movements",
            Tab::Balances => "/ui/balances",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Tab::Products => "Products",
            Tab::Movements => "Movements",
            Tab::Balances => "Balances",
        }
    }
}

/// One-shot message shown above the active tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flash {
    Success(String),
    Error(String),
}

pub fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const STYLE: &str = "body{font-family:sans-serif;max-width:60rem;margin:2rem auto;\
padding:0 1rem}nav a{margin-right:1rem}nav a.active{font-weight:bold}\
table{border-collapse:collapse;width:100%}\
td,th{border-bottom:1px solid #ddd;padding:.3rem;text-align:left}\
td.num{text-align:right}.error{color:#a00}.success{color:#070}\
form label{display:block;margin:.4rem 0}";

fn document(title: &str, content: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n\
         <body>\n{content}</body>\n</html>\n",
        title = escape(title),
    )
}

/// Full page with the tab bar, an optional flash, and the tab body.
pub fn page(tab: Tab, flash: Option<&Flash>, body: &str) -> String {
    let mut content = String::from("<h1>Inventory</h1>\n<nav>");
    for t in Tab::ALL {
        let class = if t == tab { " class=\"active\"" } else { "" };
        content.push_str(&format!("<a href=\"{}\"{class}>{}</a>", t.path(), t.label()));
    }
    content.push_str("</nav>\n");

    match flash {
        Some(Flash::Success(msg)) => {
            content.push_str(&format!("<p class=\"success\" role=\"status\">{}</p>\n", escape(msg)))
        }
        Some(Flash::Error(msg)) => {
            content.push_str(&format!("<p class=\"error\" role=\"alert\">{}</p>\n", escape(msg)))
        }
        None => {}
    }

    content.push_str(body);
    document(&format!("Inventory · {}", tab.label()), &content)
}

/// Shown on every UI route when the store was unreachable at startup.
pub fn unavailable_page(message: &str) -> String {
    document(
        "Inventory · unavailable",
        &format!(
            "<h1>Inventory</h1>\n<p class=\"error\" role=\"alert\">{}</p>\n",
            escape(message)
        ),
    )
}

fn error_paragraph(err: &InventoryError) -> String {
    format!("<p class=\"error\">{}</p>\n", escape(&err.to_string()))
}

fn qty(value: Decimal) -> String {
    format!("{value:.2}")
}

// -------------------------
// Products
// -------------------------

pub fn products_body(
    form: &ProductForm,
    products: &Result<Vec<Product>, InventoryError>,
) -> String {
    let mut out = String::from(
        "<h2>Register product</h2>\n<form method=\"post\" action=\"/ui/products\">\n",
    );
    out.push_str(&format!(
        "<label>SKU <input name=\"sku\" required value=\"{}\"></label>\n",
        escape(&form.sku)
    ));
    out.push_str(&format!(
        "<label>Name <input name=\"name\" required value=\"{}\"></label>\n",
        escape(&form.name)
    ));
    out.push_str(&format!(
        "<label>Unit <input name=\"unit\" placeholder=\"{DEFAULT_UNIT}\" value=\"{}\"></label>\n",
        escape(&form.unit)
    ));
    out.push_str("<button type=\"submit\">Register</button>\n</form>\n<h2>Products</h2>\n");

    match products {
        Err(e) => out.push_str(&error_paragraph(e)),
        Ok(list) if list.is_empty() => out.push_str("<p>No products yet.</p>\n"),
        Ok(list) => {
            out.push_str(
                "<table>\n<tr><th>SKU</th><th>Name</th><th>Unit</th><th>Created</th></tr>\n",
            );
            for p in list {
                out.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    escape(p.sku.as_str()),
                    escape(&p.name),
                    escape(&p.unit),
                    p.created_at.format("%Y-%m-%d %H:%M"),
                ));
            }
            out.push_str("</table>\n");
        }
    }
    out
}

// -------------------------
// Movements
// -------------------------

pub fn movements_body(
    form: &MovementForm,
    products: &Result<Vec<Product>, InventoryError>,
    moves: &Result<Vec<Movement>, InventoryError>,
) -> String {
    let mut out = String::from("<h2>Record movement</h2>\n");

    match products {
        Err(e) => out.push_str(&error_paragraph(e)),
        Ok(list) if list.is_empty() => out.push_str(
            "<p>Register a product first on the \
             <a href=\"/ui/products\">Products</a> tab.</p>\n",
        ),
        Ok(list) => out.push_str(&movement_form(form, list)),
    }

    let by_id: HashMap<ProductId, &Product> = match products {
        Ok(list) => index_by_id(list),
        Err(_) => HashMap::new(),
    };

    out.push_str("<h2>Recent movements</h2>\n");
    match moves {
        Err(e) => out.push_str(&error_paragraph(e)),
        Ok(list) if list.is_empty() => out.push_str("<p>No movements yet.</p>\n"),
        Ok(list) => {
            out.push_str(
                "<table>\n<tr><th>When</th><th>Product</th><th>Type</th>\
                 <th>Qty</th><th>Note</th></tr>\n",
            );
            for m in list {
                let product = match by_id.get(&m.product_id) {
                    Some(p) => format!("{} · {}", p.sku, p.name),
                    None => m.product_id.to_string(),
                };
                out.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td>\
                     <td class=\"num\">{}</td><td>{}</td></tr>\n",
                    m.created_at.format("%Y-%m-%d %H:%M"),
                    escape(&product),
                    m.move_type,
                    qty(m.qty.value()),
                    escape(m.note.as_deref().unwrap_or("")),
                ));
            }
            out.push_str("</table>\n");
        }
    }
    out
}

fn movement_form(form: &MovementForm, products: &[Product]) -> String {
    let mut out = String::from(
        "<form method=\"post\" action=\"/ui/movements\">\n\
         <label>Product <select name=\"product_id\" required>\n",
    );
    for p in products {
        let id = p.id.to_string();
        let selected = if id == form.product_id.trim() { " selected" } else { "" };
        out.push_str(&format!(
            "<option value=\"{id}\"{selected}>{} · {}</option>\n",
            escape(p.sku.as_str()),
            escape(&p.name),
        ));
    }
    out.push_str("</select></label>\n<label>Type <select name=\"move_type\">\n");
    for t in MoveType::ALL {
        let selected = if t.as_str().eq_ignore_ascii_case(form.move_type.trim()) {
            " selected"
        } else {
            ""
        };
        out.push_str(&format!("<option value=\"{t}\"{selected}>{t}</option>\n"));
    }
    out.push_str("</select></label>\n");
    out.push_str(&format!(
        "<label>Qty <input name=\"qty\" type=\"number\" min=\"0.01\" step=\"0.01\" \
         required value=\"{}\"></label>\n",
        escape(&form.qty)
    ));
    out.push_str(&format!(
        "<label>Note <input name=\"note\" value=\"{}\"></label>\n",
        escape(&form.note)
    ));
    out.push_str("<button type=\"submit\">Record</button>\n</form>\n");
    out
}

// -------------------------
// Balances
// -------------------------

pub fn balances_body(rows: &Result<Vec<BalanceRow>, InventoryError>) -> String {
    let mut out = String::from("<h2>Stock balances</h2>\n");
    match rows {
        Err(e) => out.push_str(&error_paragraph(e)),
        Ok(list) if list.is_empty() => out.push_str("<p>No products yet.</p>\n"),
        Ok(list) => {
            out.push_str(
                "<table>\n<tr><th>SKU</th><th>Name</th><th>Unit</th><th>Balance</th></tr>\n",
            );
            for r in list {
                out.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td></tr>\n",
                    escape(&r.sku),
                    escape(&r.name),
                    escape(&r.unit),
                    qty(r.balance),
                ));
            }
            out.push_str("</table>\n");
        }
    }
    out
}
