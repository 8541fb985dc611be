//! SVG document serialization (spec §6 "External interfaces"; ported from
//! `flat/svg.py`'s `serialize`).

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::color::dump;
use crate::error::Result;
use crate::page::{Item, Page};
use crate::text::escape_xml;

/// Serialize one page to a complete SVG 1.1 document, embedding every
/// distinct font used by top-level text blocks as a base64 `@font-face`.
///
/// Fonts used only inside a nested [`crate::page::Group`]'s text are not
/// declared here, matching `flat/svg.py`'s own top-level-only font scan.
pub fn write(page: &Page) -> Result<String> {
    let mut fonts = Vec::new();
    for item in &page.items {
        if let Item::Text(text) = item {
            for font in text.fonts() {
                if !fonts.iter().any(|f: &std::rc::Rc<crate::font::Font>| std::rc::Rc::ptr_eq(f, &font)) {
                    fonts.push(font);
                }
            }
        }
    }

    let defs = if fonts.is_empty() {
        String::new()
    } else {
        let faces: Vec<String> = fonts
            .iter()
            .map(|font| {
                let name = font.postscript_name().ok().flatten().unwrap_or_default();
                let data = STANDARD.encode(font.embed());
                format!(
                    "@font-face {{\n    font-family: \"{name}\";\n    src: url(\"data:font/sfnt;base64,{data}\");\n}}"
                )
            })
            .collect();
        format!("<defs>\n<style>\n{}\n</style>\n</defs>\n", faces.join("\n"))
    };

    let mut body = Vec::with_capacity(page.items.len());
    for item in &page.items {
        body.push(item.svg()?);
    }

    Ok(format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <svg version=\"1.1\" xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" \
         width=\"{}pt\" height=\"{}pt\" viewBox=\"0 0 {} {}\">\n\
         <title>{}</title>\n\
         {}{}\n\
         </svg>",
        dump(page.width),
        dump(page.height),
        dump(page.width),
        dump(page.height),
        escape_xml(&page.title),
        defs,
        body.join("\n")
    ))
}

impl Page {
    /// Render this page to a complete SVG 1.1 document.
    pub fn svg(&self) -> Result<String> {
        write(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::shape::Style;
    use crate::units::Unit;

    #[test]
    fn write_embeds_the_circle_and_the_page_viewbox() {
        let mut doc = crate::page::Document::new(100.0, 100.0, Unit::Mm);
        let page = doc.addpage();
        let circle = Style::new()
            .nofill()
            .stroke(Color::red())
            .width(2.5, Unit::Pt)
            .circle(50.0, 50.0, 20.0);
        page.place(circle);
        let svg = write(page).unwrap();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("viewBox=\"0 0 283.46"));
        assert!(svg.contains("<circle cx=\"141.732"));
        assert!(svg.contains("stroke=\"rgb(255,0,0)\""));
    }
}
