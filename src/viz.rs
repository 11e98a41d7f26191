//! Chart rendering and console panels using Plotters

use crate::data::{fixed_dataset, StandardScaler};
use crate::model::{ClusterModel, Dendrogram};
use crate::presenter::AnalysisReport;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

/// Viridis-like palette, one entry per cluster label
const CLUSTER_COLORS: [RGBColor; 6] = [
    RGBColor(68, 1, 84),
    RGBColor(33, 145, 140),
    RGBColor(253, 231, 37),
    RGBColor(59, 82, 139),
    RGBColor(94, 201, 98),
    RGBColor(72, 40, 120),
];

/// Merges above the cut line
const LINK_COLOR: RGBColor = RGBColor(80, 80, 80);

fn cluster_color(label: usize) -> RGBColor {
    CLUSTER_COLORS[label % CLUSTER_COLORS.len()]
}

/// Paths of the charts written for one report
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPaths {
    pub scatter: PathBuf,
    pub dendrogram: PathBuf,
}

/// Scatter of the fixed samples coloured by cluster, with the query point
/// overlaid as a red cross
pub fn create_scatter_chart(report: &AnalysisReport, output_path: &Path) -> crate::Result<()> {
    let weights: Vec<f64> = report.samples.iter().map(|s| s.weight_kg).collect();
    let heights: Vec<f64> = report.samples.iter().map(|s| s.height_cm).collect();

    let (w_min, w_max) = bounds(weights.iter().copied().chain([report.query.weight_kg()]));
    let (h_min, h_max) = bounds(heights.iter().copied().chain([report.query.height_cm()]));

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Cluster Localization", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((w_min - 5.0)..(w_max + 5.0), (h_min - 5.0)..(h_max + 5.0))?;

    chart
        .configure_mesh()
        .x_desc("Weight (kg)")
        .y_desc("Height (cm)")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for cluster in 0..report.n_clusters {
        let color = cluster_color(cluster);
        let points: Vec<(f64, f64)> = report
            .samples
            .iter()
            .zip(report.labels.iter())
            .filter(|&(_, &label)| label == cluster)
            .map(|(s, _)| (s.weight_kg, s.height_cm))
            .collect();

        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, 6, color.filled())))?
            .label(format!("Cluster {}", cluster))
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }

    let subject = (report.query.weight_kg(), report.query.height_cm());
    chart
        .draw_series(std::iter::once(Cross::new(subject, 10, RED.stroke_width(3))))?
        .label("Subject")
        .legend(|(x, y)| Cross::new((x, y), 5, RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    log::debug!("Scatter chart saved to {}", output_path.display());
    Ok(())
}

/// Dendrogram of the Ward linkage with the k-cluster cut drawn across it
pub fn create_dendrogram_chart(
    dendrogram: &Dendrogram,
    labels: &[usize],
    n_clusters: usize,
    output_path: &Path,
) -> crate::Result<()> {
    let n = dendrogram.n_samples();
    if n == 0 {
        anyhow::bail!("Cannot draw an empty dendrogram");
    }
    let top = dendrogram
        .steps()
        .iter()
        .map(|s| s.distance)
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let cut = dendrogram.cut_height(n_clusters);

    // Horizontal position and cluster colour of every node id
    let mut x_pos = vec![0.0_f64; n + dendrogram.steps().len()];
    let mut y_pos = vec![0.0_f64; x_pos.len()];
    let mut node_label: Vec<Option<usize>> = vec![None; x_pos.len()];
    let leaf_order = dendrogram.leaf_order();
    for (slot, &leaf) in leaf_order.iter().enumerate() {
        x_pos[leaf] = 5.0 + 10.0 * slot as f64;
        node_label[leaf] = labels.get(leaf).copied();
    }

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let width = 10.0 * n as f64;
    let mut chart = ChartBuilder::on(&root)
        .caption("Dendrogram Analysis", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(20)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..width, (-0.06 * top)..(top * 1.05))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_x_axis()
        .y_desc("Ward distance")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (s, step) in dendrogram.steps().iter().enumerate() {
        let node = n + s;
        let (l, r) = (step.left, step.right);
        x_pos[node] = (x_pos[l] + x_pos[r]) / 2.0;
        y_pos[node] = step.distance;

        let below_cut = cut.map_or(true, |c| step.distance < c);
        node_label[node] = match (node_label[l], node_label[r]) {
            (Some(a), Some(b)) if a == b && below_cut => Some(a),
            _ => None,
        };
        let color = node_label[node].map_or(LINK_COLOR, cluster_color);

        chart.draw_series(std::iter::once(PathElement::new(
            vec![
                (x_pos[l], y_pos[l]),
                (x_pos[l], step.distance),
                (x_pos[r], step.distance),
                (x_pos[r], y_pos[r]),
            ],
            color.stroke_width(2),
        )))?;
    }

    chart.draw_series(leaf_order.iter().map(|&leaf| {
        Text::new(
            leaf.to_string(),
            (x_pos[leaf] - 1.0, -0.02 * top),
            ("sans-serif", 14),
        )
    }))?;

    if let Some(height) = cut {
        chart
            .draw_series(LineSeries::new(
                vec![(0.0, height), (width, height)],
                RED.stroke_width(1),
            ))?
            .label(format!("{} clusters", n_clusters))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], &RED));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    log::debug!("Dendrogram chart saved to {}", output_path.display());
    Ok(())
}

/// Write both charts for `report` into `output_dir`
pub fn render_report(report: &AnalysisReport, output_dir: &Path) -> crate::Result<ChartPaths> {
    std::fs::create_dir_all(output_dir)?;
    let paths = ChartPaths {
        scatter: output_dir.join("scatter.png"),
        dendrogram: output_dir.join("dendrogram.png"),
    };

    create_scatter_chart(report, &paths.scatter)?;
    create_dendrogram_chart(
        &report.dendrogram,
        &report.labels,
        report.n_clusters,
        &paths.dendrogram,
    )?;

    Ok(paths)
}

/// Print the three metric panels
pub fn print_metrics(report: &AnalysisReport) {
    println!("\n=== Analysis ===");
    println!(
        "Subject: {:.1} kg, {:.1} cm",
        report.query.weight_kg(),
        report.query.height_cm()
    );
    println!("  {:<16} {}", "BMI INDEX", report.bmi);
    println!("  {:<16} #{}", "CLUSTER ID", report.cluster_id);
    println!("  {:<16} {}", "SECURITY STATUS", report.status);
}

/// Print cluster sizes and raw-unit centroids after training
pub fn print_training_summary(scaler: &StandardScaler, model: &ClusterModel) {
    let total = model.labels.len();
    println!("\n=== Cluster Statistics ===");
    println!("Number of clusters: {}", model.n_clusters);
    println!("Total samples: {}", total);

    for (i, &size) in model.cluster_sizes().iter().enumerate() {
        let percentage = (size as f64 / total as f64) * 100.0;
        println!("  Cluster {}: {} samples ({:.1}%)", i, size, percentage);
    }

    match scaler.inverse_transform(&model.centroids) {
        Ok(centroids) => {
            println!("\nCluster centroids:");
            println!("  Cluster | Weight kg | Height cm");
            println!("  --------|-----------|----------");
            for (i, row) in centroids.outer_iter().enumerate() {
                println!("  {:7} | {:9.1} | {:9.1}", i, row[0], row[1]);
            }
        }
        Err(e) => log::warn!("Could not map centroids back to raw units: {}", e),
    }

    if let Ok(scaled) = scaler.transform(&fixed_dataset()) {
        println!("\nWithin-cluster sum of squares: {:.3}", model.inertia(&scaled));
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
