//! Command implementations.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use framegrid_cli::config::Settings;
use framegrid_core::{
    compose_grid, preview_transform, CropSession, GridSpec, ImageRef, PixelRect, TransformStore,
};
use tracing::info;

use crate::cli::{EditArgs, ExtractArgs, GridArgs, ShowArgs};

pub fn run_extract(settings: &Settings, args: &ExtractArgs) -> Result<()> {
    let service = settings.service()?;
    let video = service
        .upload_video(&args.video)
        .with_context(|| format!("failed to upload {}", args.video.display()))?;
    let result = service
        .extract_highlights(&video.video_id, args.clips, args.clip_duration)
        .with_context(|| format!("failed to extract highlights from {}", video.video_id))?;

    if result.highlight_images.is_empty() {
        bail!("the service returned no highlight frames");
    }
    for image in &result.highlight_images {
        println!("{image}");
    }
    if let Some(list) = &args.list {
        write_list(list, &result.highlight_images)?;
    }
    Ok(())
}

pub fn run_edit(settings: &Settings, args: &EditArgs) -> Result<()> {
    let mut store = settings.open_store().context("failed to open the store")?;
    let source = settings.image_source()?;
    let image = ImageRef::new(args.image.as_str());

    let mut session = CropSession::new(&mut store, &source);
    session
        .open(image.clone())
        .with_context(|| format!("failed to open {image}"))?;

    let crop = match (args.crop, session.crop()) {
        (Some(c), _) => PixelRect::new(c.x, c.y, c.size, c.size),
        (None, Some(current)) => current,
        (None, None) => bail!("session for {image} has no crop"),
    };
    let zoom = args.zoom.or(session.zoom()).unwrap_or(1.0);
    let crop = session.update_crop(crop, zoom)?;
    for _ in 0..args.rotate % 4 {
        session.update_rotation()?;
    }
    let rotation = session.rotation();

    let saved = session
        .save()
        .with_context(|| format!("failed to save edits for {image}"))?;
    info!(%image, "edits saved");

    println!(
        "{image}: crop {:.0},{:.0} {:.0}px (x={:.4} y={:.4} size={:.4}) zoom {:.2} rotation {}",
        crop.x,
        crop.y,
        crop.width,
        saved.crop_area.x(),
        saved.crop_area.y(),
        saved.crop_area.width(),
        saved.zoom,
        rotation.map(|r| r.to_string()).unwrap_or_default(),
    );
    Ok(())
}

pub fn run_show(settings: &Settings, args: &ShowArgs) -> Result<()> {
    let store = settings.open_store().context("failed to open the store")?;

    for raw in &args.images {
        let image = ImageRef::new(raw.as_str());
        let transform = store.transform(&image)?;
        let rotation = store.rotation(&image)?.unwrap_or_default();
        let preview = preview_transform(
            transform.as_ref().map(|t| &t.crop_area),
            f64::from(rotation.degrees()),
        );

        match transform {
            Some(t) => println!(
                "{image}: crop x={:.4} y={:.4} w={:.4} h={:.4} zoom {:.2} rotation {rotation} preview {}",
                t.crop_area.x(),
                t.crop_area.y(),
                t.crop_area.width(),
                t.crop_area.height(),
                t.zoom,
                preview.to_css(),
            ),
            None => println!(
                "{image}: no crop, rotation {rotation} preview {}",
                preview.to_css()
            ),
        }
    }
    Ok(())
}

pub fn run_grid(settings: &Settings, args: &GridArgs) -> Result<()> {
    let mut images: Vec<ImageRef> = args.images.iter().map(|s| ImageRef::new(s.as_str())).collect();
    if let Some(list) = &args.list {
        images.extend(read_list(list)?);
    }
    if images.is_empty() {
        bail!("no frames given; pass IMAGE arguments or --list");
    }

    let store = settings.open_store().context("failed to open the store")?;
    let source = settings.image_source()?;
    let spec = GridSpec::with_cell_size(args.cell_size);

    let grid = compose_grid(&images, &store, &source, &spec).context("failed to compose grid")?;
    for warning in &grid.report.warnings {
        eprintln!("warning: {warning}");
    }

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let path = args.out.join(&grid.file_name);
    fs::write(&path, &grid.bytes).with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), width = grid.width, height = grid.height, "grid written");
    println!("{}", path.display());
    Ok(())
}

/// Non-empty, trimmed lines of a reference list.
fn read_list(path: &Path) -> Result<Vec<ImageRef>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_list(&text))
}

fn parse_list(text: &str) -> Vec<ImageRef> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ImageRef::from)
        .collect()
}

fn write_list(path: &Path, images: &[ImageRef]) -> Result<()> {
    let mut text = String::new();
    for image in images {
        text.push_str(image.as_str());
        text.push('\n');
    }
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CropArg;
    use framegrid_core::{NormalizedRect, Rotation};
    use std::path::PathBuf;

    fn settings(dir: &Path) -> Settings {
        Settings::new(dir.join("store"), "http://localhost:8000").unwrap()
    }

    fn write_frame(dir: &Path, name: &str, width: u32, height: u32) -> String {
        let img = image_bytes(width, height);
        let path = dir.join(name);
        fs::write(&path, img).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn image_bytes(width: u32, height: u32) -> Vec<u8> {
        let pixels = vec![128u8; (width * height * 3) as usize];
        framegrid_core::encode::encode_jpeg(&pixels, width, height, 90).unwrap()
    }

    #[test]
    fn test_list_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("frames.txt");
        let images = vec![ImageRef::from("/media/a.jpg"), ImageRef::from("b.jpg")];

        write_list(&path, &images).unwrap();
        assert_eq!(read_list(&path).unwrap(), images);
    }

    #[test]
    fn test_parse_list_skips_blanks_and_comments() {
        let parsed = parse_list("# frames\n\n  a.jpg  \nb.jpg\n");
        assert_eq!(parsed, vec![ImageRef::from("a.jpg"), ImageRef::from("b.jpg")]);
    }

    #[test]
    fn test_edit_then_show_then_grid() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = settings(tmp.path());
        let frame = write_frame(tmp.path(), "frame_3.jpg", 64, 64);

        run_edit(
            &settings,
            &EditArgs {
                image: frame.clone(),
                crop: Some(CropArg {
                    x: 16.0,
                    y: 16.0,
                    size: 32.0,
                }),
                zoom: Some(2.0),
                rotate: 3,
            },
        )
        .unwrap();

        let store = settings.open_store().unwrap();
        let image = ImageRef::from(frame.as_str());
        let saved = store.transform(&image).unwrap().unwrap();
        assert_eq!(
            saved.crop_area,
            NormalizedRect::new(0.25, 0.25, 0.5, 0.5).unwrap()
        );
        assert_eq!(saved.zoom, 2.0);
        assert_eq!(store.rotation(&image).unwrap(), Some(Rotation::Deg270));

        run_show(&settings, &ShowArgs { images: vec![frame.clone()] }).unwrap();

        let out = tmp.path().join("out");
        run_grid(
            &settings,
            &GridArgs {
                images: vec![frame],
                list: None,
                cell_size: 40,
                out: out.clone(),
            },
        )
        .unwrap();
        let written: Vec<PathBuf> = fs::read_dir(&out)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(written.len(), 1);
        assert!(written[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("grid_"));
    }

    #[test]
    fn test_grid_requires_images() {
        let tmp = tempfile::tempdir().unwrap();
        let result = run_grid(
            &settings(tmp.path()),
            &GridArgs {
                images: Vec::new(),
                list: None,
                cell_size: 40,
                out: tmp.path().to_path_buf(),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_edit_missing_frame_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let result = run_edit(
            &settings(tmp.path()),
            &EditArgs {
                image: "missing.jpg".to_string(),
                crop: None,
                zoom: None,
                rotate: 0,
            },
        );
        assert!(result.is_err());
    }
}
