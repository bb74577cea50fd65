// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: replay recorded segmentation/classification output through the
//! label policy and write the resulting inpainting mask and request
//!
//! Usage:
//!   redesign-replay <scene.json> --prompt <text> [options]

use room_redesign::{
    mask_ops, BoundingBox, ClassifiedObject, LabelVocabulary, PipelineError, Prediction,
    RedesignConfig, RedesignPipeline, Result, SceneSummary,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded collaborator output for one image
#[derive(Debug, Deserialize)]
struct ReplayScene {
    image_width: u32,
    image_height: u32,
    regions: Vec<ReplayRegion>,
}

#[derive(Debug, Deserialize)]
struct ReplayRegion {
    /// Mask PNG, relative to the scene file
    mask: PathBuf,
    bbox: BoundingBox,
    /// Foreground pixel count; computed from the mask when absent
    area: Option<u64>,
    predictions: Vec<Prediction>,
}

/// Everything but the image that the inpainting model needs
#[derive(Debug, Serialize)]
struct ReplayRequest<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    guidance_scale: f32,
    num_inference_steps: u32,
    seed: u64,
    changed_labels: &'a BTreeSet<String>,
}

struct Options {
    scene_path: PathBuf,
    prompt: String,
    output_dir: PathBuf,
    config_path: Option<PathBuf>,
    vocabulary_path: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()))
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let options = match parse_options(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&options) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_options(args: &[String]) -> std::result::Result<Options, String> {
    let mut prompt = None;
    let mut output_dir = PathBuf::from("redesign-out");
    let mut config_path = None;
    let mut vocabulary_path = None;

    let mut i = 2;
    while i < args.len() {
        let value = |i: usize| {
            args.get(i + 1)
                .cloned()
                .ok_or_else(|| format!("Missing value for {}", args[i]))
        };
        match args[i].as_str() {
            "--prompt" => {
                prompt = Some(value(i)?);
                i += 1;
            }
            "--output-dir" => {
                output_dir = PathBuf::from(value(i)?);
                i += 1;
            }
            "--config" => {
                config_path = Some(PathBuf::from(value(i)?));
                i += 1;
            }
            "--vocabulary" => {
                vocabulary_path = Some(PathBuf::from(value(i)?));
                i += 1;
            }
            other => return Err(format!("Unknown option: {}", other)),
        }
        i += 1;
    }

    Ok(Options {
        scene_path: PathBuf::from(&args[1]),
        prompt: prompt.ok_or("--prompt is required")?,
        output_dir,
        config_path,
        vocabulary_path,
    })
}

fn run(options: &Options) -> Result<()> {
    println!("=== Room Redesign Replay ===");
    println!();

    // Step 1: Configuration
    println!("[1/5] Loading configuration...");
    let config = match &options.config_path {
        Some(path) => RedesignConfig::from_json(&fs::read_to_string(path)?)?,
        None => RedesignConfig::from_env()?,
    };
    let vocabulary = match &options.vocabulary_path {
        Some(path) => LabelVocabulary::from_json(&fs::read_to_string(path)?)?,
        None => LabelVocabulary::standard(),
    };
    let pipeline = RedesignPipeline::new(config, Arc::new(vocabulary));

    // Step 2: Scene
    println!("[2/5] Loading scene: {}", options.scene_path.display());
    let scene: ReplayScene = serde_json::from_str(&fs::read_to_string(&options.scene_path)?)?;
    let base_dir = options
        .scene_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let image_size = (scene.image_width, scene.image_height);
    println!(
        "  Image size: {}x{} pixels, {} regions",
        scene.image_width,
        scene.image_height,
        scene.regions.len()
    );

    // Step 3: Classification policy
    println!("[3/5] Classifying regions...");
    let objects = classify_regions(&pipeline, &scene, &base_dir)?;
    let clean = pipeline.scene_filter().clean(&objects);
    let summary = SceneSummary::from_objects(clean.as_slice());
    println!("  {} meaningful objects:", summary.total());
    for (label, count) in &summary.counts {
        println!("    - {}: {}", label, count);
    }
    for suggestion in summary.suggestions() {
        println!("  -> {}", suggestion);
    }

    // Step 4: Mask and prompt
    println!("[4/5] Selecting mask for: {}", options.prompt);
    let Some(prepared) = pipeline.prepare(image_size, clean.as_slice(), &options.prompt) else {
        println!("  Nothing to redesign: no furniture or requested wall/floor found.");
        return Ok(());
    };
    let labels: Vec<&str> = prepared
        .selection
        .changed_labels
        .iter()
        .map(String::as_str)
        .collect();
    println!("  Masked: {}", labels.join(", "));
    println!(
        "  Mask coverage: {} pixels",
        mask_ops::foreground_count(&prepared.selection.mask)
    );

    // Step 5: Output
    println!("[5/5] Writing {}", options.output_dir.display());
    fs::create_dir_all(&options.output_dir)?;
    prepared
        .selection
        .mask
        .save(options.output_dir.join("mask.png"))?;

    let config = pipeline.config();
    let request = ReplayRequest {
        prompt: &prepared.prompt,
        negative_prompt: &config.negative_prompt,
        guidance_scale: config.guidance_scale,
        num_inference_steps: config.num_inference_steps,
        seed: config.seed,
        changed_labels: &prepared.selection.changed_labels,
    };
    fs::write(
        options.output_dir.join("request.json"),
        serde_json::to_string_pretty(&request)?,
    )?;

    println!();
    println!("Prompt: {}", prepared.prompt);
    Ok(())
}

fn classify_regions(
    pipeline: &RedesignPipeline,
    scene: &ReplayScene,
    base_dir: &Path,
) -> Result<Vec<ClassifiedObject>> {
    let total_area = scene.image_width as u64 * scene.image_height as u64;
    let mut objects = Vec::with_capacity(scene.regions.len());

    for region in &scene.regions {
        let mask = image::open(base_dir.join(&region.mask))?.to_luma8();
        if mask.dimensions() != (scene.image_width, scene.image_height) {
            return Err(PipelineError::MaskShape {
                expected: (scene.image_width, scene.image_height),
                actual: mask.dimensions(),
            });
        }

        let Some(bbox) = region.bbox.clamp_to(scene.image_width, scene.image_height) else {
            println!("  Skipping {}: bbox outside image", region.mask.display());
            continue;
        };

        let area = region
            .area
            .unwrap_or_else(|| mask_ops::foreground_count(&mask));
        let label = pipeline.classifier().decide(
            (bbox.width, bbox.height),
            area,
            total_area,
            &region.predictions,
        );
        println!("  {} -> {}", region.mask.display(), label);

        objects.push(ClassifiedObject {
            mask: Arc::new(mask),
            bbox,
            area,
            label,
        });
    }

    Ok(objects)
}

fn print_usage() {
    println!("Room Redesign Replay");
    println!();
    println!("Usage: redesign-replay <scene.json> --prompt <text> [options]");
    println!();
    println!("Options:");
    println!("  --prompt <text>        Redesign request (required)");
    println!("  --output-dir <dir>     Where to write mask.png and request.json (default: redesign-out)");
    println!("  --config <file>        JSON configuration (default: REDESIGN_* environment)");
    println!("  --vocabulary <file>    JSON label vocabulary (default: built-in)");
    println!();
    println!("Scene file:");
    println!("  {{\"image_width\": W, \"image_height\": H, \"regions\": [");
    println!("    {{\"mask\": \"masks/0.png\", \"bbox\": {{\"x\": 0, \"y\": 0, \"width\": W, \"height\": H}},");
    println!("     \"area\": 1234, \"predictions\": [{{\"label\": \"studio couch\", \"confidence\": 0.8}}]}}");
    println!("  ]}}");
}
