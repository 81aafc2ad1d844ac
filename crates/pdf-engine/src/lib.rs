use image::{ImageBuffer, Rgba};
use lopdf::Document;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub type PageSurface = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// The only media type accepted from the file picker or a drop.
pub const ACCEPTED_MEDIA_TYPE: &str = "application/pdf";

const PDF_SIGNATURE: &[u8] = b"%PDF-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl Default for PageSize {
    fn default() -> Self {
        Self { width_pt: 612.0, height_pt: 792.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedDocument {
    pub handle: DocumentHandle,
    pub page_count: u32,
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Opaque paginated rendering capability shared by both viewports.
///
/// A loaded document can be re-rendered at any scale without reloading it.
pub trait PaginatedRenderer {
    fn load(&mut self, source: OpenSource) -> Result<LoadedDocument, RendererError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, RendererError>;
    fn page_size(&self, handle: DocumentHandle, page_index: u32)
        -> Result<PageSize, RendererError>;
    fn render(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        scale: f32,
    ) -> Result<PageSurface, RendererError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), RendererError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum RendererBackend {
    Lopdf,
    /// Pdfium bound from an explicit library directory.
    Pdfium { library_dir: PathBuf },
}

/// Start-up configuration for the renderer. Passed once to [`init_renderer`].
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub backend: RendererBackend,
    /// Used for pages whose MediaBox is missing or malformed.
    pub fallback_page_size: PageSize,
    /// Longest edge of a rendered surface, in pixels.
    pub max_render_edge_px: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: RendererBackend::Lopdf,
            fallback_page_size: PageSize::default(),
            max_render_edge_px: 8192,
        }
    }
}

/// Builds the renderer selected by `config`. Call once during start-up.
pub fn init_renderer(
    config: RendererConfig,
) -> Result<Box<dyn PaginatedRenderer>, RendererError> {
    match config.backend.clone() {
        RendererBackend::Lopdf => Ok(Box::new(LopdfRenderer::with_config(config))),
        #[cfg(feature = "pdfium")]
        RendererBackend::Pdfium { library_dir } => {
            Ok(Box::new(pdfium_backend::PdfiumRenderer::bind(&library_dir, config)?))
        }
        #[cfg(not(feature = "pdfium"))]
        RendererBackend::Pdfium { .. } => {
            Err(RendererError::Backend("built without the `pdfium` feature".to_owned()))
        }
    }
}

/// Returns true when a picked or dropped file should be opened.
///
/// Both the declared media type and the leading signature must match.
pub fn accepts_file(media_type: &str, bytes: &[u8]) -> bool {
    let essence = media_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case(ACCEPTED_MEDIA_TYPE) && bytes.starts_with(PDF_SIGNATURE)
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    page_sizes: Vec<PageSize>,
}

#[derive(Debug)]
pub struct LopdfRenderer {
    config: RendererConfig,
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl Default for LopdfRenderer {
    fn default() -> Self {
        Self::with_config(RendererConfig::default())
    }
}

impl LopdfRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RendererConfig) -> Self {
        Self { config, next_handle: 0, docs: HashMap::new() }
    }

    fn parse_sizes(&self, bytes: &[u8]) -> Result<Vec<PageSize>, RendererError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(RendererError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
                })
                .unwrap_or(self.config.fallback_page_size);

            sizes.push(size);
        }

        if sizes.is_empty() {
            return Err(RendererError::Backend("document has no pages".to_owned()));
        }

        Ok(sizes)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, RendererError> {
        self.docs.get(&handle).ok_or(RendererError::InvalidHandle(handle.raw()))
    }
}

/// Pixel size of a page rendered at `scale`, shrunk to fit the configured
/// longest edge.
fn surface_dimensions(config: &RendererConfig, size: PageSize, scale: f32) -> (u32, u32) {
    let scale = if scale <= 0.0 { 1.0 } else { scale };
    let width = (size.width_pt * scale).round().max(1.0);
    let height = (size.height_pt * scale).round().max(1.0);

    let max_edge = config.max_render_edge_px.max(1) as f32;
    let longest = width.max(height);
    if longest <= max_edge {
        return (width as u32, height as u32);
    }

    let shrink = max_edge / longest;
    ((width * shrink).round().max(1.0) as u32, (height * shrink).round().max(1.0) as u32)
}

impl PaginatedRenderer for LopdfRenderer {
    fn load(&mut self, source: OpenSource) -> Result<LoadedDocument, RendererError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let page_sizes = self.parse_sizes(&bytes)?;
        let page_count = page_sizes.len() as u32;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, DocumentRecord { page_sizes });

        tracing::debug!(handle = handle.raw(), page_count, "document loaded");
        Ok(LoadedDocument { handle, page_count })
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, RendererError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, RendererError> {
        let record = self.record(handle)?;
        record.page_sizes.get(page_index as usize).copied().ok_or(RendererError::PageOutOfRange {
            page: page_index,
            page_count: record.page_sizes.len() as u32,
        })
    }

    fn render(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        scale: f32,
    ) -> Result<PageSurface, RendererError> {
        let page_size = self.page_size(handle, page_index)?;
        let (width, height) = surface_dimensions(&self.config, page_size, scale);

        let mut surface = PageSurface::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                surface.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                surface.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                surface.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                surface.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(surface)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), RendererError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(RendererError::InvalidHandle(handle.raw()))
    }
}

#[cfg(feature = "pdfium")]
pub mod pdfium_backend {
    use super::*;
    use pdfium_render::prelude::{PdfDocument, PdfPage, PdfRenderConfig, Pdfium, PdfiumError};

    /// Renderer that rasterizes page content through a Pdfium library.
    ///
    /// The library is bound once, when [`init_renderer`] runs at start-up, and
    /// stays bound for the rest of the process.
    pub struct PdfiumRenderer {
        pdfium: &'static Pdfium,
        config: RendererConfig,
        next_handle: u64,
        docs: HashMap<DocumentHandle, PdfDocument<'static>>,
    }

    impl PdfiumRenderer {
        pub fn bind(library_dir: &Path, config: RendererConfig) -> Result<Self, RendererError> {
            let library = Pdfium::pdfium_platform_library_name_at_path(library_dir);
            let bindings = Pdfium::bind_to_library(library).map_err(|err| {
                RendererError::Backend(format!(
                    "failed to bind pdfium from {}: {err}",
                    library_dir.display()
                ))
            })?;
            let pdfium: &'static Pdfium = Box::leak(Box::new(Pdfium::new(bindings)));

            tracing::debug!(library_dir = %library_dir.display(), "pdfium bound");
            Ok(Self { pdfium, config, next_handle: 0, docs: HashMap::new() })
        }

        fn with_page<T>(
            &self,
            handle: DocumentHandle,
            page_index: u32,
            f: impl FnOnce(&PdfPage<'_>) -> Result<T, RendererError>,
        ) -> Result<T, RendererError> {
            let document =
                self.docs.get(&handle).ok_or(RendererError::InvalidHandle(handle.raw()))?;
            let page_count = document.pages().len() as u32;
            let out_of_range = RendererError::PageOutOfRange { page: page_index, page_count };

            let index = match u16::try_from(page_index) {
                Ok(index) if page_index < page_count => index,
                _ => return Err(out_of_range),
            };
            let page = document.pages().get(index).map_err(backend_error)?;
            f(&page)
        }
    }

    fn backend_error(err: PdfiumError) -> RendererError {
        RendererError::Backend(err.to_string())
    }

    fn page_size_of(page: &PdfPage<'_>) -> PageSize {
        PageSize { width_pt: page.width().value, height_pt: page.height().value }
    }

    impl PaginatedRenderer for PdfiumRenderer {
        fn load(&mut self, source: OpenSource) -> Result<LoadedDocument, RendererError> {
            let document = match source {
                OpenSource::Path(path) => self.pdfium.load_pdf_from_file(&path, None),
                OpenSource::Bytes(bytes) => self.pdfium.load_pdf_from_byte_vec(bytes, None),
            }
            .map_err(backend_error)?;

            let page_count = document.pages().len() as u32;
            if page_count == 0 {
                return Err(RendererError::Backend("document has no pages".to_owned()));
            }

            self.next_handle += 1;
            let handle = DocumentHandle(self.next_handle);
            self.docs.insert(handle, document);

            tracing::debug!(handle = handle.raw(), page_count, "document loaded through pdfium");
            Ok(LoadedDocument { handle, page_count })
        }

        fn page_count(&self, handle: DocumentHandle) -> Result<u32, RendererError> {
            let document =
                self.docs.get(&handle).ok_or(RendererError::InvalidHandle(handle.raw()))?;
            Ok(document.pages().len() as u32)
        }

        fn page_size(
            &self,
            handle: DocumentHandle,
            page_index: u32,
        ) -> Result<PageSize, RendererError> {
            self.with_page(handle, page_index, |page| Ok(page_size_of(page)))
        }

        fn render(
            &self,
            handle: DocumentHandle,
            page_index: u32,
            scale: f32,
        ) -> Result<PageSurface, RendererError> {
            self.with_page(handle, page_index, |page| {
                let (width, height) = surface_dimensions(&self.config, page_size_of(page), scale);

                let render_config = PdfRenderConfig::new()
                    .set_target_width(width as i32)
                    .set_target_height(height as i32);
                let bitmap = page.render_with_config(&render_config).map_err(backend_error)?;

                let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
                let pixels = bitmap.as_rgba_bytes().to_vec();
                PageSurface::from_raw(width, height, pixels).ok_or_else(|| {
                    RendererError::Backend(format!("pdfium bitmap is not {width}x{height} rgba"))
                })
            })
        }

        fn close(&mut self, handle: DocumentHandle) -> Result<(), RendererError> {
            self.docs.remove(&handle).map(|_| ()).ok_or(RendererError::InvalidHandle(handle.raw()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::path::Path;

        #[test]
        fn missing_library_is_a_backend_error() {
            let missing = Path::new("/nonexistent/pdfium");
            let result = PdfiumRenderer::bind(missing, RendererConfig::default());

            match result {
                Err(RendererError::Backend(message)) => {
                    assert!(message.contains("/nonexistent/pdfium"), "{message}")
                }
                Err(other) => panic!("unexpected error: {other}"),
                Ok(_) => panic!("binding a missing library should fail"),
            }
        }
    }
}

/// In-memory PDF fixtures for tests in this and dependent crates.
#[cfg(any(test, feature = "test-support"))]
pub mod testing {
    use lopdf::{dictionary, Document, Object};

    /// Builds a PDF with one page per entry of `sizes` (width, height in points).
    pub fn pdf_with_pages(sizes: &[(f32, f32)]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::with_capacity(sizes.len());
        for &(width, height) in sizes {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ],
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        if let Err(err) = doc.save_to(&mut bytes) {
            panic!("synthetic pdf should serialize: {err}");
        }
        bytes
    }

    /// A PDF of `page_count` US-letter pages.
    pub fn letter_pdf(page_count: usize) -> Vec<u8> {
        pdf_with_pages(&vec![(612.0, 792.0); page_count])
    }
}
