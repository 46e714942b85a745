//! Math typesetting with Typst, rendered to SVG.
//!
//! Each expression is compiled as a one-file document in an in-memory world
//! that resolves no imports. Fonts are loaded once per process: the bundled
//! `typst-assets` set, which carries the math fonts equations need, plus any
//! files or directories listed in `MATHMARK_FONT_PATHS`. Unreadable entries
//! are skipped with a warning.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lru::LruCache;
use once_cell::sync::Lazy;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::layout::PagedDocument;
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};

use super::{MathRenderer, RendererOptions};
use crate::error::MathRenderError;

/// Extra font files or directories, separated like `PATH`.
pub const FONT_PATHS_ENV: &str = "MATHMARK_FONT_PATHS";

const CACHE_SIZE: NonZeroUsize = NonZeroUsize::MIN.saturating_add(127);

/// Renders expressions as Typst equations.
///
/// Reads the `preamble` key of the renderer options, which is inserted
/// before the equation (e.g. `#set text(fill: blue)`).
#[derive(Clone, Copy, Debug, Default)]
pub struct TypstRenderer;

impl TypstRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl MathRenderer for TypstRenderer {
    fn render(&self, expr: &str, options: &RendererOptions) -> Result<String, MathRenderError> {
        let preamble = options.get_str("preamble").unwrap_or_default();
        render_svg(expr, options.display_mode, preamble)
    }
}

/// The state for a single Typst compilation.
struct EquationWorld<'a> {
    library: &'a LazyHash<Library>,
    book: &'a LazyHash<FontBook>,
    fonts: &'a [Font],
    source: Source,
    main_id: FileId,
}

impl World for EquationWorld<'_> {
    fn library(&self) -> &LazyHash<Library> {
        self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        self.book
    }

    fn main(&self) -> FileId {
        self.main_id
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main_id {
            Ok(self.source.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rooted_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(id.vpath().as_rooted_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        None
    }
}

struct FontSet {
    book: LazyHash<FontBook>,
    fonts: Vec<Font>,
}

fn push_font_bytes<T>(book: &mut FontBook, fonts: &mut Vec<Font>, bytes: T)
where
    T: AsRef<[u8]> + Send + Sync + 'static,
{
    for font in Font::iter(Bytes::new(bytes)) {
        book.push(font.info().clone());
        fonts.push(font);
    }
}

fn load_fonts() -> FontSet {
    let mut book = FontBook::new();
    let mut fonts = Vec::new();

    for font_bytes in typst_assets::fonts() {
        push_font_bytes(&mut book, &mut fonts, font_bytes);
    }

    let paths: Vec<PathBuf> = std::env::var_os(FONT_PATHS_ENV)
        .map(|value| std::env::split_paths(&value).collect())
        .unwrap_or_default();
    for path in expand_font_paths(&paths) {
        match std::fs::read(&path) {
            Ok(font_bytes) => push_font_bytes(&mut book, &mut fonts, font_bytes),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to read font file")
            }
        }
    }
    tracing::debug!(count = fonts.len(), "Loaded math fonts");

    FontSet {
        book: LazyHash::new(book),
        fonts,
    }
}

fn expand_font_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            if let Ok(entries) = std::fs::read_dir(path) {
                let mut files: Vec<_> = entries
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|entry| is_font_file(entry))
                    .collect();
                files.sort();
                out.extend(files);
            }
        } else if is_font_file(path) {
            out.push(path.clone());
        }
    }
    out
}

fn is_font_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    matches!(ext, "ttf" | "otf" | "ttc" | "otc")
}

/// (expression, display, preamble)
type CacheKey = (String, bool, String);
type Cache = Mutex<LruCache<CacheKey, String>>;

static FONTS: Lazy<FontSet> = Lazy::new(load_fonts);
static TYPST_LIBRARY: Lazy<LazyHash<Library>> = Lazy::new(|| LazyHash::new(Library::default()));
static RENDER_CACHE: Lazy<Cache> = Lazy::new(|| Mutex::new(LruCache::new(CACHE_SIZE)));

fn wrap_source(expr: &str, display: bool, preamble: &str) -> String {
    let margin = if display { "0.5em" } else { "0.2em" };
    let mut source = format!("#set page(width: auto, height: auto, margin: {margin})\n");
    if display {
        source.push_str("#set block(spacing: 0.5em)\n");
    }
    if !preamble.is_empty() {
        source.push_str(preamble);
        source.push('\n');
    }
    source.push_str(&format!("#math.equation(block: {display}, $ {expr} $)"));
    source
}

fn render_svg(expr: &str, display: bool, preamble: &str) -> Result<String, MathRenderError> {
    let cache_key = (expr.to_string(), display, preamble.to_string());
    // a poisoned lock only costs the cache
    if let Ok(mut cache) = RENDER_CACHE.lock() {
        if let Some(cached) = cache.get(&cache_key) {
            return Ok(cached.clone());
        }
    }

    let main_id = FileId::new(None, VirtualPath::new("main.typ"));
    let world = EquationWorld {
        library: &TYPST_LIBRARY,
        book: &FONTS.book,
        fonts: &FONTS.fonts,
        source: Source::new(main_id, wrap_source(expr, display, preamble)),
        main_id,
    };

    let warned = typst::compile::<PagedDocument>(&world);
    for warning in &warned.warnings {
        tracing::debug!(severity = ?warning.severity, message = %warning.message, "Typst math warning");
    }
    let document = warned.output.map_err(|errors| MathRenderError::Compile {
        message: errors
            .iter()
            .map(|error| error.message.to_string())
            .collect::<Vec<_>>()
            .join("; "),
    })?;
    let page = document.pages.first().ok_or(MathRenderError::EmptyOutput)?;
    let svg = typst_svg::svg(page);

    if let Ok(mut cache) = RENDER_CACHE.lock() {
        cache.put(cache_key, svg.clone());
    }
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{expand_font_paths, is_font_file, wrap_source};
    use pretty_assertions::assert_eq;

    #[test]
    fn wraps_inline_and_display_equations() {
        assert_eq!(
            wrap_source("x^2", false, ""),
            "#set page(width: auto, height: auto, margin: 0.2em)\n#math.equation(block: false, $ x^2 $)"
        );
        assert_eq!(
            wrap_source("x", true, "#set text(red)"),
            "#set page(width: auto, height: auto, margin: 0.5em)\n#set block(spacing: 0.5em)\n#set text(red)\n#math.equation(block: true, $ x $)"
        );
    }

    #[test]
    fn recognizes_font_extensions() {
        assert!(is_font_file(&PathBuf::from("a/NotoSans.ttf")));
        assert!(is_font_file(&PathBuf::from("b.otc")));
        assert!(!is_font_file(&PathBuf::from("readme.md")));
        assert!(!is_font_file(&PathBuf::from("fonts")));
    }

    #[test]
    fn missing_paths_expand_to_nothing() {
        let paths = vec![PathBuf::from("/definitely/not/here")];
        assert!(expand_font_paths(&paths).is_empty());
    }

    #[test]
    fn directories_expand_to_sorted_font_files() {
        let dir = std::env::temp_dir().join(format!("mathmark_fonts_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["b.otf", "a.ttf", "notes.txt"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }

        let expanded = expand_font_paths(&[dir.clone()]);
        std::fs::remove_dir_all(&dir).unwrap();
        assert_eq!(expanded, vec![dir.join("a.ttf"), dir.join("b.otf")]);
    }
}
