// In-memory SVG drawing surface
use plotters::coord::Shift;
use plotters::prelude::*;

/// SVG document currently shown on a canvas and the chart that drew it.
#[derive(Debug, Clone)]
pub struct SvgFrame {
    pub owner: u64,
    pub markup: String,
}

/// A fixed-size surface that charts draw into.
///
/// Every draw starts from a fresh buffer, so whatever was on the surface
/// before is gone once [`SvgCanvas::draw`] returns.
#[derive(Debug, Clone)]
pub struct SvgCanvas {
    id: String,
    width: u32,
    height: u32,
    frame: Option<SvgFrame>,
}

impl SvgCanvas {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            frame: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Run `paint` against a new SVG backend and keep its output as the
    /// surface contents. On error the surface is left blank.
    pub fn draw<T, E, F>(&mut self, owner: u64, paint: F) -> Result<T, E>
    where
        F: FnOnce(DrawingArea<SVGBackend<'_>, Shift>) -> Result<T, E>,
    {
        self.frame = None;
        let mut markup = String::new();
        let drawn = {
            let root = SVGBackend::with_string(&mut markup, (self.width, self.height))
                .into_drawing_area();
            paint(root)?
        };
        self.frame = Some(SvgFrame { owner, markup });
        Ok(drawn)
    }

    pub fn clear(&mut self) {
        self.frame = None;
    }

    pub fn frame(&self) -> Option<&SvgFrame> {
        self.frame.as_ref()
    }

    pub fn owner(&self) -> Option<u64> {
        self.frame.as_ref().map(|f| f.owner)
    }

    pub fn is_blank(&self) -> bool {
        self.frame.is_none()
    }

    pub fn svg(&self) -> Option<&str> {
        self.frame.as_ref().map(|f| f.markup.as_str())
    }
}
