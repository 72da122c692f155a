use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::assets::fonts::NoFonts;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "kinetic_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_raw(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn manifest(file_name: &str, dir: &str) -> BTreeMap<String, ImageAsset> {
    let mut m = BTreeMap::new();
    m.insert(
        "img_0".to_string(),
        ImageAsset {
            id: "img_0".to_string(),
            width: 2,
            height: 1,
            file_name: file_name.to_string(),
            dir: dir.to_string(),
            embedded: None,
        },
    );
    m
}

#[test]
fn normalize_rel_path_rules() {
    assert_eq!(normalize_rel_path("a/./b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("a\\b.png").unwrap(), "a/b.png");
    assert!(normalize_rel_path("/abs.png").is_err());
    assert!(normalize_rel_path("../up.png").is_err());
    assert!(normalize_rel_path("").is_err());
    assert!(normalize_rel_path("./").is_err());
}

#[test]
fn resolve_without_device_is_none_not_error() {
    let mut cache = ImageAssetCache::new(Some(PathBuf::from(".")));
    assert!(cache.resolve("img_0", &manifest("a.png", ""), None).is_none());
    assert!(cache.is_empty());
}

#[test]
fn resolve_decodes_once_and_recycle_is_idempotent() {
    let dir = temp_dir("image_cache");
    std::fs::create_dir_all(dir.join("images")).unwrap();
    std::fs::write(dir.join("images/a.png"), png_bytes()).unwrap();

    let device = RenderTarget::cpu(None);
    let m = manifest("a.png", "images/");
    let mut cache = ImageAssetCache::new(Some(dir.clone()));

    let b = cache.resolve("img_0", &m, Some(&device)).unwrap();
    assert_eq!((b.width, b.height), (2, 1));
    cache.resolve("img_0", &m, Some(&device)).unwrap();
    assert_eq!(cache.decode_count("img_0"), 1);

    cache.recycle_all();
    cache.recycle_all();
    assert!(cache.is_empty());

    cache.resolve("img_0", &m, Some(&device)).unwrap();
    assert_eq!(cache.decode_count("img_0"), 2);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_folder_or_file_yields_none() {
    let device = RenderTarget::cpu(None);
    let m = manifest("nope.png", "");

    let mut no_folder = ImageAssetCache::new(None);
    assert!(no_folder.resolve("img_0", &m, Some(&device)).is_none());

    let mut cache = ImageAssetCache::new(Some(temp_dir("image_cache_missing")));
    assert!(cache.resolve("img_0", &m, Some(&device)).is_none());
    assert!(cache.resolve("unknown", &m, Some(&device)).is_none());
}

#[test]
fn embedded_bytes_skip_the_folder() {
    let device = RenderTarget::cpu(None);
    let mut m = manifest("unused.png", "");
    m.get_mut("img_0").unwrap().embedded = Some(Arc::new(png_bytes()));

    let mut cache = ImageAssetCache::new(None);
    assert!(cache.resolve("img_0", &m, Some(&device)).is_some());
}

struct CountingDelegate(AtomicUsize);

impl ImageAssetDelegate for CountingDelegate {
    fn fetch_bitmap(&self, asset: &ImageAsset) -> Option<Bitmap> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Bitmap::from_premul(asset.width, asset.height, vec![9; (asset.width * asset.height * 4) as usize]).ok()
    }
}

#[test]
fn delegate_takes_precedence_and_is_memoized() {
    let device = RenderTarget::cpu(None);
    let delegate = Arc::new(CountingDelegate(AtomicUsize::new(0)));
    let mut cache = ImageAssetCache::new(None);
    cache.set_delegate(Some(delegate.clone()));

    let m = manifest("a.png", "");
    let b = cache.resolve("img_0", &m, Some(&device)).unwrap();
    assert_eq!(b.rgba8_premul[0], 9);
    cache.resolve("img_0", &m, Some(&device)).unwrap();
    assert_eq!(delegate.0.load(Ordering::SeqCst), 1);
}

#[test]
fn update_returns_previous_bitmap() {
    let mut cache = ImageAssetCache::new(None);
    let first = Bitmap::from_premul(1, 1, vec![1, 1, 1, 1]).unwrap();
    assert!(cache.update("a", Some(first.clone())).is_none());
    let prev = cache.update("a", Some(Bitmap::from_premul(1, 1, vec![2, 2, 2, 2]).unwrap()));
    assert_eq!(prev.as_deref(), Some(&first));
    assert!(cache.update("a", None).is_some());
    assert!(cache.is_empty());
}

#[test]
fn set_folder_recycles_only_on_change() {
    let mut cache = ImageAssetCache::new(Some(PathBuf::from("a")));
    cache.update("x", Some(Bitmap::from_premul(1, 1, vec![0; 4]).unwrap()));
    cache.set_folder(Some(PathBuf::from("a")));
    assert_eq!(cache.len(), 1);
    cache.set_folder(Some(PathBuf::from("b")));
    assert!(cache.is_empty());
    assert_eq!(cache.folder(), Some(Path::new("b")));
}

struct FixedFont;

impl FontAssetDelegate for FixedFont {
    fn fetch_font(&self, family: &str, style: &str) -> Option<Typeface> {
        (family == "Brand").then(|| Typeface {
            family: family.to_string(),
            style: style.to_string(),
            data: Arc::new(vec![1, 2, 3]),
        })
    }
}

#[test]
fn font_cache_memoizes_and_resets_on_delegate_change() {
    let device = RenderTarget::new(Arc::new(crate::assets::decode::ImageDecoder), Arc::new(NoFonts));
    let mut fonts = FontAssetCache::new();
    assert!(fonts.resolve("Brand", "Regular", None).is_none());

    fonts.set_delegate(Some(Arc::new(FixedFont)));
    assert!(fonts.resolve("Brand", "Regular", Some(&device)).is_some());
    assert!(fonts.resolve("Other", "Regular", Some(&device)).is_none());
    assert_eq!(fonts.len(), 1);

    // Memoized entries answer even without a device.
    assert!(fonts.resolve("Brand", "Regular", None).is_some());

    fonts.set_delegate(None);
    assert!(fonts.is_empty());
}

struct EmptyDelegate(AtomicUsize);

impl ImageAssetDelegate for EmptyDelegate {
    fn fetch_bitmap(&self, _asset: &ImageAsset) -> Option<Bitmap> {
        self.0.fetch_add(1, Ordering::SeqCst);
        None
    }
}

#[test]
fn failed_images_are_not_retried_until_recycled() {
    let device = RenderTarget::cpu(None);
    let delegate = Arc::new(EmptyDelegate(AtomicUsize::new(0)));
    let mut cache = ImageAssetCache::new(None);
    cache.set_delegate(Some(delegate.clone()));

    let m = manifest("a.png", "");
    for _ in 0..5 {
        assert!(cache.resolve("img_0", &m, Some(&device)).is_none());
    }
    assert_eq!(delegate.0.load(Ordering::SeqCst), 1);

    cache.recycle_all();
    assert!(cache.resolve("img_0", &m, Some(&device)).is_none());
    assert_eq!(delegate.0.load(Ordering::SeqCst), 2);

    cache.forget_failures();
    cache.resolve("img_0", &m, Some(&device));
    assert_eq!(delegate.0.load(Ordering::SeqCst), 3);
}

#[test]
fn missing_file_is_retried_after_update_or_folder_change() {
    let device = RenderTarget::cpu(None);
    let dir = temp_dir("image_cache_negative");
    std::fs::create_dir_all(&dir).unwrap();
    let m = manifest("late.png", "");

    let mut cache = ImageAssetCache::new(Some(dir.clone()));
    assert!(cache.resolve("img_0", &m, Some(&device)).is_none());

    std::fs::write(dir.join("late.png"), png_bytes()).unwrap();
    assert!(cache.resolve("img_0", &m, Some(&device)).is_none(), "failure is remembered");
    assert_eq!(cache.decode_count("img_0"), 0);

    cache.update("img_0", None);
    assert!(cache.resolve("img_0", &m, Some(&device)).is_some());
    assert_eq!(cache.decode_count("img_0"), 1);

    let mut other = ImageAssetCache::new(Some(temp_dir("image_cache_empty")));
    assert!(other.resolve("img_0", &m, Some(&device)).is_none());
    other.set_folder(Some(dir.clone()));
    assert!(other.resolve("img_0", &m, Some(&device)).is_some());

    std::fs::remove_dir_all(&dir).ok();
}

struct CountingFonts(AtomicUsize);

impl FontAssetDelegate for CountingFonts {
    fn fetch_font(&self, _family: &str, _style: &str) -> Option<Typeface> {
        self.0.fetch_add(1, Ordering::SeqCst);
        None
    }
}

#[test]
fn unresolved_fonts_are_remembered_until_the_delegate_or_device_changes() {
    let device = RenderTarget::cpu(None);
    let delegate = Arc::new(CountingFonts(AtomicUsize::new(0)));
    let mut fonts = FontAssetCache::new();
    fonts.set_delegate(Some(delegate.clone()));

    for _ in 0..4 {
        assert!(fonts.resolve("Ghost", "Regular", Some(&device)).is_none());
    }
    assert_eq!(delegate.0.load(Ordering::SeqCst), 1);
    assert!(fonts.is_empty());

    fonts.forget_missing();
    fonts.resolve("Ghost", "Regular", Some(&device));
    assert_eq!(delegate.0.load(Ordering::SeqCst), 2);

    fonts.set_delegate(Some(delegate.clone()));
    fonts.resolve("Ghost", "Regular", Some(&device));
    assert_eq!(delegate.0.load(Ordering::SeqCst), 3);
}
