//! Plot rendering and artifact storage
//!
//! Plots are SVG documents: one line per track over the predicted interval,
//! with a transcript lane underneath. Variant plots overlay REF and ALT and
//! mark the variant position. Rendered plots are written to the plots
//! directory under a random, collision-resistant name and referenced as
//! `/plots/<name>`.

use std::path::{Path, PathBuf};

use rand::Rng;
use svg::node::element::{Line, Polyline, Rectangle, Text};
use svg::Document;

use crate::annotation::TranscriptRecord;
use crate::backend::{OutputType, TrackData};
use crate::error::PredictError;
use crate::genome::{Interval, Strand, Variant};
use crate::orchestrator::{IntervalPrediction, VariantPrediction};

/// URL prefix under which artifacts are served
pub const PLOTS_URL_PREFIX: &str = "/plots";

const MARGIN_LEFT: f32 = 200.0;
const MARGIN_RIGHT: f32 = 20.0;
const HEADER_HEIGHT: f32 = 40.0;
const TRANSCRIPT_ROW_HEIGHT: f32 = 22.0;

const REF_COLOR: &str = "#9ca3af";
const ALT_COLOR: &str = "#dc2626";
const TRACK_COLOR: &str = "#2563eb";

/// Errors raised while rendering or storing a plot
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlotError {
    #[error("no tracks to plot")]
    EmptyTracks,

    #[error("failed to write plot: {0}")]
    Io(String),
}

/// Turns predictions into plot documents
pub trait PlotRenderer: Send + Sync {
    /// Render the tracks of one output type over an interval
    fn render_interval(
        &self,
        output_type: OutputType,
        data: &TrackData,
        transcripts: &[TranscriptRecord],
    ) -> Result<String, PlotError>;

    /// Render REF and ALT tracks of one output type around a variant
    fn render_variant(
        &self,
        output_type: OutputType,
        reference: &TrackData,
        alternate: &TrackData,
        variant: &Variant,
        transcripts: &[TranscriptRecord],
    ) -> Result<String, PlotError>;
}

/// SVG renderer
#[derive(Debug, Clone)]
pub struct SvgPlotRenderer {
    pub width: f32,
    pub track_height: f32,
    /// Tracks beyond this many are not drawn
    pub max_tracks: usize,
}

impl Default for SvgPlotRenderer {
    fn default() -> Self {
        Self {
            width: 1200.0,
            track_height: 60.0,
            max_tracks: 10,
        }
    }
}

/// Maps genomic coordinates onto the horizontal plot axis
struct Axis {
    start: i64,
    end: i64,
    left: f32,
    right: f32,
}

impl Axis {
    fn new(interval: &Interval, width: f32) -> Self {
        Self {
            start: interval.start(),
            end: interval.end(),
            left: MARGIN_LEFT,
            right: width - MARGIN_RIGHT,
        }
    }

    fn x(&self, pos: i64) -> f32 {
        let pos = pos.clamp(self.start, self.end);
        let frac = (pos - self.start) as f32 / (self.end - self.start).max(1) as f32;
        self.left + frac * (self.right - self.left)
    }
}

impl SvgPlotRenderer {
    fn track_count(&self, data: &TrackData) -> usize {
        data.num_tracks().min(self.max_tracks)
    }

    fn height(&self, tracks: usize, transcripts: usize) -> f32 {
        HEADER_HEIGHT
            + tracks as f32 * self.track_height
            + (transcripts.max(1) as f32 + 1.0) * TRANSCRIPT_ROW_HEIGHT
    }

    fn document(&self, height: f32, title: String) -> Document {
        Document::new()
            .set("viewBox", (0, 0, self.width, height))
            .set("width", self.width)
            .set("height", height)
            .add(
                Rectangle::new()
                    .set("x", 0)
                    .set("y", 0)
                    .set("width", self.width)
                    .set("height", height)
                    .set("fill", "#ffffff"),
            )
            .add(
                Text::new(title)
                    .set("x", 10)
                    .set("y", 24)
                    .set("font-family", "sans-serif")
                    .set("font-size", 14)
                    .set("fill", "#111827"),
            )
    }

    /// Polyline points for one track, scaled into `[top, top + height)`
    fn track_points(
        &self,
        data: &TrackData,
        track: usize,
        axis: &Axis,
        top: f32,
        (min, max): (f64, f64),
    ) -> String {
        let span = (max - min).max(f64::EPSILON);
        let bottom = top + self.track_height - 6.0;
        let usable = self.track_height - 12.0;
        let resolution = i64::from(data.resolution.max(1));
        data.column(track)
            .enumerate()
            .map(|(row, value)| {
                let pos = data.interval.start() + row as i64 * resolution + resolution / 2;
                let y = bottom - ((f64::from(value) - min) / span) as f32 * usable;
                format!("{:.1},{:.1}", axis.x(pos), y)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[allow(clippy::too_many_arguments)]
    fn add_track(
        &self,
        doc: Document,
        data: &TrackData,
        track: usize,
        axis: &Axis,
        top: f32,
        range: (f64, f64),
        color: &str,
    ) -> Document {
        doc.add(
            Polyline::new()
                .set("points", self.track_points(data, track, axis, top, range))
                .set("fill", "none")
                .set("stroke", color)
                .set("stroke-width", 1),
        )
    }

    fn add_track_label(&self, doc: Document, data: &TrackData, track: usize, top: f32) -> Document {
        let label = &data.metadata[track];
        let mut name = label.name.clone();
        if label.strand != Strand::Unstranded {
            name.push_str(&format!(" ({})", label.strand));
        }
        if name.chars().count() > 28 {
            name = name.chars().take(27).chain(std::iter::once('…')).collect();
        }
        doc.add(
            Text::new(name)
                .set("x", 10)
                .set("y", top + self.track_height / 2.0)
                .set("font-family", "sans-serif")
                .set("font-size", 11)
                .set("fill", "#374151"),
        )
    }

    fn add_transcripts(
        &self,
        mut doc: Document,
        transcripts: &[TranscriptRecord],
        axis: &Axis,
        top: f32,
    ) -> Document {
        if transcripts.is_empty() {
            return doc.add(
                Text::new("No transcripts in this region")
                    .set("x", axis.left)
                    .set("y", top + 14.0)
                    .set("font-family", "sans-serif")
                    .set("font-size", 11)
                    .set("fill", "#6b7280"),
            );
        }

        for (i, tx) in transcripts.iter().enumerate() {
            let y = top + i as f32 * TRANSCRIPT_ROW_HEIGHT + TRANSCRIPT_ROW_HEIGHT / 2.0;
            doc = doc.add(
                Line::new()
                    .set("x1", axis.x(tx.start))
                    .set("y1", y)
                    .set("x2", axis.x(tx.end))
                    .set("y2", y)
                    .set("stroke", "#111827")
                    .set("stroke-width", 1),
            );
            for &(exon_start, exon_end) in &tx.exons {
                let x = axis.x(exon_start);
                doc = doc.add(
                    Rectangle::new()
                        .set("x", x)
                        .set("y", y - 5.0)
                        .set("width", (axis.x(exon_end) - x).max(1.0))
                        .set("height", 10)
                        .set("fill", "#111827"),
                );
            }
            let arrow = match tx.strand {
                Strand::Plus => " →",
                Strand::Minus => " ←",
                Strand::Unstranded => "",
            };
            doc = doc.add(
                Text::new(format!("{}{}", tx.gene_name, arrow))
                    .set("x", 10)
                    .set("y", y + 4.0)
                    .set("font-family", "sans-serif")
                    .set("font-size", 11)
                    .set("font-style", "italic")
                    .set("fill", "#111827"),
            );
        }
        doc
    }
}

/// Min/max over the first `tracks` columns of each bundle
fn value_range<'a>(bundles: impl IntoIterator<Item = &'a TrackData>, track: usize) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for data in bundles {
        if let Some(stats) = data.stats(track) {
            min = min.min(stats.min);
            max = max.max(stats.max);
        }
    }
    if min.is_finite() && max.is_finite() {
        (min, max)
    } else {
        (0.0, 1.0)
    }
}

impl PlotRenderer for SvgPlotRenderer {
    fn render_interval(
        &self,
        output_type: OutputType,
        data: &TrackData,
        transcripts: &[TranscriptRecord],
    ) -> Result<String, PlotError> {
        let tracks = self.track_count(data);
        if tracks == 0 || data.num_positions() == 0 {
            return Err(PlotError::EmptyTracks);
        }

        let axis = Axis::new(&data.interval, self.width);
        let title = format!("{} | {}", output_type, data.interval);
        let mut doc = self.document(self.height(tracks, transcripts.len()), title);

        for track in 0..tracks {
            let top = HEADER_HEIGHT + track as f32 * self.track_height;
            let range = value_range([data], track);
            doc = self.add_track(doc, data, track, &axis, top, range, TRACK_COLOR);
            doc = self.add_track_label(doc, data, track, top);
        }

        let lane_top = HEADER_HEIGHT + tracks as f32 * self.track_height;
        doc = self.add_transcripts(doc, transcripts, &axis, lane_top);
        Ok(doc.to_string())
    }

    fn render_variant(
        &self,
        output_type: OutputType,
        reference: &TrackData,
        alternate: &TrackData,
        variant: &Variant,
        transcripts: &[TranscriptRecord],
    ) -> Result<String, PlotError> {
        let tracks = self.track_count(reference).min(self.track_count(alternate));
        if tracks == 0 || reference.num_positions() == 0 {
            return Err(PlotError::EmptyTracks);
        }

        let axis = Axis::new(&reference.interval, self.width);
        let title = format!(
            "{} | {} | REF {} vs ALT {}",
            output_type,
            variant,
            variant.reference_bases(),
            variant.alternate_bases()
        );
        let height = self.height(tracks, transcripts.len());
        let mut doc = self.document(height, title);

        for track in 0..tracks {
            let top = HEADER_HEIGHT + track as f32 * self.track_height;
            let range = value_range([reference, alternate], track);
            doc = self.add_track(doc, reference, track, &axis, top, range, REF_COLOR);
            doc = self.add_track(doc, alternate, track, &axis, top, range, ALT_COLOR);
            doc = self.add_track_label(doc, reference, track, top);
        }

        let x = axis.x(variant.position() as i64 - 1);
        doc = doc.add(
            Line::new()
                .set("x1", x)
                .set("y1", HEADER_HEIGHT)
                .set("x2", x)
                .set("y2", height)
                .set("stroke", ALT_COLOR)
                .set("stroke-dasharray", "4 3")
                .set("stroke-width", 1),
        );

        let lane_top = HEADER_HEIGHT + tracks as f32 * self.track_height;
        doc = self.add_transcripts(doc, transcripts, &axis, lane_top);
        Ok(doc.to_string())
    }
}

/// Which prediction a plot artifact was rendered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Interval,
    Variant,
}

impl PlotKind {
    fn infix(&self) -> &'static str {
        match self {
            PlotKind::Interval => "",
            PlotKind::Variant => "variant_",
        }
    }
}

/// Directory of rendered plot files
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A fresh artifact name: 32 random hex digits plus the output-type suffix
    ///
    /// Variant plots are named `<hex>_variant_<type>.svg`, interval plots
    /// `<hex>_<type>.svg`.
    pub fn artifact_name(kind: PlotKind, output_type: OutputType) -> String {
        let token: [u8; 16] = rand::thread_rng().gen();
        let hex: String = token.iter().map(|b| format!("{:02x}", b)).collect();
        format!("{}_{}{}.svg", hex, kind.infix(), output_type.file_suffix())
    }

    /// Write a plot and return its URL reference
    pub async fn save(
        &self,
        kind: PlotKind,
        output_type: OutputType,
        content: &str,
    ) -> Result<String, PlotError> {
        let name = Self::artifact_name(kind, output_type);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PlotError::Io(format!("{}: {}", self.dir.display(), e)))?;
        let path = self.dir.join(&name);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| PlotError::Io(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "Wrote plot artifact");
        Ok(format!("{}/{}", PLOTS_URL_PREFIX, name))
    }

    /// Path of a stored artifact, or `None` for names that could escape the
    /// directory
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        valid.then(|| self.dir.join(name))
    }
}

/// Render and store one plot per requested output type, in request order
pub async fn interval_plots(
    renderer: &dyn PlotRenderer,
    store: &ArtifactStore,
    prediction: &IntervalPrediction,
    output_types: &[OutputType],
) -> Result<Vec<String>, PredictError> {
    let mut urls = Vec::with_capacity(output_types.len());
    for &output_type in output_types {
        let result = match prediction.output.get(output_type) {
            Some(data) => renderer.render_interval(output_type, data, &prediction.transcripts),
            None => Err(PlotError::EmptyTracks),
        };
        urls.push(store_plot(store, PlotKind::Interval, output_type, result).await?);
    }
    Ok(urls)
}

/// Render and store one REF/ALT plot per requested output type
pub async fn variant_plots(
    renderer: &dyn PlotRenderer,
    store: &ArtifactStore,
    prediction: &VariantPrediction,
    output_types: &[OutputType],
) -> Result<Vec<String>, PredictError> {
    let mut urls = Vec::with_capacity(output_types.len());
    for &output_type in output_types {
        let result = match prediction.output.pair(output_type) {
            Some((reference, alternate)) => renderer.render_variant(
                output_type,
                reference,
                alternate,
                &prediction.variant,
                &prediction.transcripts,
            ),
            None => Err(PlotError::EmptyTracks),
        };
        urls.push(store_plot(store, PlotKind::Variant, output_type, result).await?);
    }
    Ok(urls)
}

async fn store_plot(
    store: &ArtifactStore,
    kind: PlotKind,
    output_type: OutputType,
    rendered: Result<String, PlotError>,
) -> Result<String, PredictError> {
    let saved = match rendered {
        Ok(content) => store.save(kind, output_type, &content).await,
        Err(e) => Err(e),
    };
    saved.map_err(|e| {
        tracing::error!(output_type = %output_type, error = %e, "Plot generation failed");
        PredictError::Plot {
            output_type,
            msg: e.to_string(),
        }
    })
}
