// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand};
use cocomask::{
    Error, Settings,
    coco::{
        BinaryMask, CocoDataset, CocoIndex, CocoReader, CocoRle, CocoSegmentation, CocoWriter,
        Dimensions,
    },
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file, defaults to the per-user cocomask.toml
    #[clap(long, env = "COCOMASK_CONFIG")]
    config: Option<PathBuf>,

    /// Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Summarize an annotation file, ZIP archive or directory.
    Info {
        /// Annotations JSON, ZIP or directory
        annotations: PathBuf,
    },
    /// List annotation ids matching all of the given filters.
    AnnIds {
        /// Annotations JSON, ZIP or directory
        annotations: PathBuf,

        /// Only annotations on these images
        #[clap(long, value_delimiter = ',')]
        images: Vec<u64>,

        /// Only annotations of these categories
        #[clap(long, value_delimiter = ',')]
        categories: Vec<u32>,

        /// Only annotations with LOW < area < HIGH
        #[clap(long, num_args = 2, value_names = ["LOW", "HIGH"], allow_negative_numbers = true)]
        area: Vec<f64>,

        /// Only crowd (true) or non-crowd (false) annotations
        #[clap(long)]
        crowd: Option<bool>,
    },
    /// List category ids by name and supercategory name.
    CatIds {
        /// Annotations JSON, ZIP or directory
        annotations: PathBuf,

        /// Category names
        #[clap(long, value_delimiter = ',')]
        names: Vec<String>,

        /// Supercategory names
        #[clap(long, value_delimiter = ',')]
        supercategories: Vec<String>,
    },
    /// List ids of images containing any of the given categories, or all
    /// images when none are given.
    ImgIds {
        /// Annotations JSON, ZIP or directory
        annotations: PathBuf,

        /// Category ids
        #[clap(long, value_delimiter = ',')]
        categories: Vec<u32>,
    },
    /// Decode one annotation's RLE segmentation.
    Decode {
        /// Annotations JSON, ZIP or directory
        annotations: PathBuf,

        /// Annotation id
        #[clap(long)]
        annotation: u64,

        /// Print the mask as rows of '#' and '.'
        #[clap(long)]
        ascii: bool,
    },
    /// Encode a text mask (rows of 0 and 1) as an RLE segmentation.
    Encode {
        /// Mask text file
        mask: PathBuf,

        /// Emit uncompressed counts instead of the compact string
        #[clap(long)]
        uncompressed: bool,
    },
    /// Convert every uncompressed RLE segmentation to compressed RLE.
    Compress {
        /// Input annotations JSON, ZIP or directory
        input: PathBuf,

        /// Output JSON, or ZIP when the name ends in .zip
        output: PathBuf,

        /// Pretty-print the output JSON
        #[clap(long)]
        pretty: bool,
    },
    /// Decode every RLE segmentation and report any that fail.
    Verify {
        /// Annotations JSON, ZIP or directory
        annotations: PathBuf,
    },
}

fn read_dataset(settings: &Settings, path: &Path) -> Result<CocoDataset, Error> {
    let reader = CocoReader::with_options(settings.read.clone());

    if path.is_dir() {
        reader.read_directory(path)
    } else if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        reader.read_annotations_zip(path)
    } else {
        reader.read_json(path)
    }
}

fn progress_bar(len: usize, message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message(message);
    bar
}

fn print_ids<T: std::fmt::Display>(ids: &[T]) {
    for id in ids {
        println!("{}", id);
    }
}

fn handle_info(settings: &Settings, annotations: &Path) -> Result<(), Error> {
    let dataset = read_dataset(settings, annotations)?;

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for ann in &dataset.annotations {
        let kind = ann.segmentation.as_ref().map_or("none", |s| s.kind());
        *kinds.entry(kind).or_default() += 1;
    }
    let kinds = kinds
        .iter()
        .map(|(kind, count)| format!("{} {}", count, kind))
        .collect::<Vec<_>>()
        .join(", ");

    if let Some(description) = &dataset.info.description {
        println!("Description: {}", description);
    }
    println!("Images: {}", dataset.images.len());
    println!("Annotations: {} ({})", dataset.annotations.len(), kinds);
    println!("Categories: {}", dataset.categories.len());
    println!("Licenses: {}", dataset.licenses.len());
    Ok(())
}

fn handle_ann_ids(
    settings: &Settings,
    annotations: &Path,
    images: Vec<u64>,
    categories: Vec<u32>,
    area: Vec<f64>,
    crowd: Option<bool>,
) -> Result<(), Error> {
    let area = match area.as_slice() {
        [] => None,
        [low, high] => Some((*low, *high)),
        _ => {
            return Err(Error::InvalidParameters(
                "--area takes exactly two values".to_string(),
            ));
        }
    };

    let index = CocoIndex::new(read_dataset(settings, annotations)?);
    print_ids(&index.annotation_ids(&images, &categories, area, crowd));
    Ok(())
}

fn handle_cat_ids(
    settings: &Settings,
    annotations: &Path,
    names: Vec<String>,
    supercategories: Vec<String>,
) -> Result<(), Error> {
    let index = CocoIndex::new(read_dataset(settings, annotations)?);
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let supercategories: Vec<&str> = supercategories.iter().map(String::as_str).collect();
    print_ids(&index.category_ids(&names, &supercategories));
    Ok(())
}

fn handle_img_ids(
    settings: &Settings,
    annotations: &Path,
    categories: Vec<u32>,
) -> Result<(), Error> {
    let index = CocoIndex::new(read_dataset(settings, annotations)?);
    print_ids(&index.image_ids(&categories));
    Ok(())
}

fn handle_decode(
    settings: &Settings,
    annotations: &Path,
    annotation: u64,
    ascii: bool,
) -> Result<(), Error> {
    let index = CocoIndex::new(read_dataset(settings, annotations)?);
    let mask = index.annotation_mask(annotation)?;

    let bbox = index
        .annotation(annotation)
        .and_then(|ann| ann.segmentation.as_ref())
        .map(|segmentation| segmentation.bbox())
        .transpose()?
        .unwrap_or_default();

    println!(
        "Annotation {}: {} mask, area {}, bbox [{}, {}, {}, {}]",
        annotation,
        mask.dims(),
        mask.area(),
        bbox[0],
        bbox[1],
        bbox[2],
        bbox[3]
    );

    if ascii {
        for y in 0..mask.height() {
            let row: String = (0..mask.width())
                .map(|x| if mask.get(x, y) == Some(1) { '#' } else { '.' })
                .collect();
            println!("{}", row);
        }
    }

    Ok(())
}

/// Parse rows of `0`/`1` characters into a mask. Whitespace inside a row is
/// ignored and blank lines are skipped.
fn parse_text_mask(text: &str) -> Result<BinaryMask, Error> {
    let mut width = None;
    let mut height = 0u32;
    let mut row_major = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let row = line
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| match c {
                '0' => Ok(0u8),
                '1' => Ok(1u8),
                other => Err(Error::InvalidParameters(format!(
                    "line {}: unexpected character {:?}",
                    line_no + 1,
                    other
                ))),
            })
            .collect::<Result<Vec<u8>, Error>>()?;
        if row.is_empty() {
            continue;
        }

        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                return Err(Error::InvalidParameters(format!(
                    "line {}: expected {} values, found {}",
                    line_no + 1,
                    w,
                    row.len()
                )));
            }
            Some(_) => {}
        }

        row_major.extend(row);
        height += 1;
    }

    let width = u32::try_from(width.unwrap_or(0))
        .map_err(|_| Error::InvalidParameters("mask is too wide".to_string()))?;
    BinaryMask::from_row_major(&row_major, Dimensions::new(width, height))
}

fn handle_encode(mask: &Path, uncompressed: bool) -> Result<(), Error> {
    let mask = parse_text_mask(&std::fs::read_to_string(mask)?)?;
    log::debug!("Encoding {} mask with area {}", mask.dims(), mask.area());

    let segmentation = if uncompressed {
        CocoSegmentation::Rle(CocoRle::from_mask(&mask))
    } else {
        CocoSegmentation::from_mask(&mask)
    };

    println!("{}", serde_json::to_string(&segmentation)?);
    Ok(())
}

fn handle_compress(
    settings: &Settings,
    input: &Path,
    output: &Path,
    pretty: bool,
) -> Result<(), Error> {
    let mut dataset = read_dataset(settings, input)?;

    let bar = progress_bar(dataset.annotations.len(), "Compressing");
    let converted = dataset
        .annotations
        .par_iter_mut()
        .map(|ann| {
            let result = match &ann.segmentation {
                Some(CocoSegmentation::Rle(rle)) => match rle.compress() {
                    Ok(compressed) => {
                        ann.segmentation = Some(CocoSegmentation::CompressedRle(compressed));
                        Ok(1usize)
                    }
                    Err(err) => Err(Error::CocoError(format!("Annotation {}: {}", ann.id, err))),
                },
                _ => Ok(0),
            };
            bar.inc(1);
            result
        })
        .collect::<Result<Vec<_>, Error>>()?
        .into_iter()
        .sum::<usize>();
    bar.finish_and_clear();

    let mut options = settings.write.clone();
    options.pretty |= pretty;
    let writer = CocoWriter::with_options(options);

    if output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        writer.write_zip(&dataset, output, "annotations/instances.json")?;
    } else {
        writer.write_json(&dataset, output)?;
    }

    println!(
        "Compressed {} of {} annotations into {}",
        converted,
        dataset.annotations.len(),
        output.display()
    );
    Ok(())
}

fn handle_verify(settings: &Settings, annotations: &Path) -> Result<(), Error> {
    let index = CocoIndex::new(read_dataset(settings, annotations)?);
    let anns = &index.dataset().annotations;

    let bar = progress_bar(anns.len(), "Verifying");
    let outcomes: Vec<Option<Result<(), String>>> = anns
        .par_iter()
        .map(|ann| {
            let outcome = match &ann.segmentation {
                Some(segmentation) if segmentation.dims().is_some() => {
                    Some(match index.annotation_mask(ann.id) {
                        Ok(mask) => {
                            if mask.area() as f64 != ann.area {
                                log::warn!(
                                    "Annotation {} stores area {} but decodes to {}",
                                    ann.id,
                                    ann.area,
                                    mask.area()
                                );
                            }
                            Ok(())
                        }
                        Err(err) => Err(format!("Annotation {}: {}", ann.id, err)),
                    })
                }
                _ => None,
            };
            bar.inc(1);
            outcome
        })
        .collect();
    bar.finish_and_clear();

    let checked = outcomes.iter().flatten().count();
    let failures: Vec<&String> = outcomes
        .iter()
        .flatten()
        .filter_map(|outcome| outcome.as_ref().err())
        .collect();

    for failure in &failures {
        eprintln!("{}", failure);
    }

    if !failures.is_empty() {
        return Err(Error::CocoError(format!(
            "{} of {} RLE annotations failed to decode",
            failures.len(),
            checked
        )));
    }

    println!(
        "Verified {} RLE annotations ({} skipped)",
        checked,
        anns.len() - checked
    );
    Ok(())
}

#[cfg(feature = "profiling")]
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[cfg(not(feature = "profiling"))]
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn main() -> Result<(), Error> {
    init_logging();

    let args = Args::parse();

    // Encoding a text mask needs no settings.
    if let Command::Encode { mask, uncompressed } = &args.cmd {
        return handle_encode(mask, *uncompressed);
    }

    let settings = Settings::load(args.config.as_deref())?;
    log::debug!("{:?}", settings);

    match args.cmd {
        Command::Encode { .. } => unreachable!(),
        Command::Info { annotations } => handle_info(&settings, &annotations),
        Command::AnnIds {
            annotations,
            images,
            categories,
            area,
            crowd,
        } => handle_ann_ids(&settings, &annotations, images, categories, area, crowd),
        Command::CatIds {
            annotations,
            names,
            supercategories,
        } => handle_cat_ids(&settings, &annotations, names, supercategories),
        Command::ImgIds {
            annotations,
            categories,
        } => handle_img_ids(&settings, &annotations, categories),
        Command::Decode {
            annotations,
            annotation,
            ascii,
        } => handle_decode(&settings, &annotations, annotation, ascii),
        Command::Compress {
            input,
            output,
            pretty,
        } => handle_compress(&settings, &input, &output, pretty),
        Command::Verify { annotations } => handle_verify(&settings, &annotations),
    }
}
