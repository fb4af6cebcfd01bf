use crate::plots::backend::FontSafeBackend;
use crate::plots::model::{
    extent, format_day, pad_range, CombinedPlot, MapPlot, PanelLayout, TimeSeries,
};
use crate::plots::palette::ColorScale;
use anyhow::{Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const BEFORE_COLOR: RGBColor = RGBColor(214, 39, 40);
const AFTER_COLOR: RGBColor = RGBColor(31, 119, 180);
const GNSS_COLOR: RGBColor = RGBColor(44, 160, 44);
const COLORBAR_WIDTH: u32 = 120;
const COLORBAR_STEPS: usize = 64;

pub fn render_combined(path: &Path, plot: &CombinedPlot) -> Result<()> {
    let root = FontSafeBackend::new(BitMapBackend::new(path, (1200, 1000))).into_drawing_area();
    draw_combined(root, plot).with_context(|| format!("rendering {}", path.display()))
}

pub fn render_map(path: &Path, plot: &MapPlot) -> Result<()> {
    let size = match plot.layout {
        PanelLayout::Stacked => (1400, 1000 * plot.panels.len().max(1) as u32),
        PanelLayout::SideBySide => (800 * plot.panels.len().max(1) as u32, 800),
    };
    let root = FontSafeBackend::new(BitMapBackend::new(path, size)).into_drawing_area();
    draw_map(root, plot).with_context(|| format!("rendering {}", path.display()))
}

fn draw_combined<DB>(root: DrawingArea<DB, Shift>, plot: &CombinedPlot) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let subtitle = plot
        .date_range()
        .map(|(start, end)| format!("Date Range: {} to {}", start, end))
        .unwrap_or_default();
    let body = root.titled(&subtitle, ("sans-serif", 16))?;
    let x_range = plot.x_range().map(|r| pad_range(r, 0.02)).unwrap_or((0.0, 1.0));

    let (upper, lower) = body.split_vertically(body.dim_in_pixel().1 / 2);
    let mut top = Vec::new();
    if let Some(before) = plot.before.as_ref() {
        top.push((before, BEFORE_COLOR));
    }
    draw_time_panel(
        &upper,
        &format!("InSAR Time Series Before Alignment - Station {}", plot.station),
        &top,
        x_range,
    )?;

    let mut bottom = Vec::new();
    if let Some(after) = plot.after.as_ref() {
        bottom.push((after, AFTER_COLOR));
    }
    if let Some(gnss) = plot.gnss.as_ref() {
        bottom.push((gnss, GNSS_COLOR));
    }
    draw_time_panel(
        &lower,
        &format!(
            "Combined InSAR After Alignment and GNSS LOS - Station {}",
            plot.station
        ),
        &bottom,
        x_range,
    )?;

    root.present()?;
    Ok(())
}

fn draw_time_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    series: &[(&TimeSeries, RGBColor)],
    x_range: (f64, f64),
) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let y_range = extent(
        series
            .iter()
            .flat_map(|(s, _)| s.samples.iter().chain(&s.trend_line).map(|p| p.1)),
    )
    .map(|r| pad_range(r, 0.08))
    .unwrap_or((-1.0, 1.0));

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(15)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 55)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|v: &f64| format_day(*v))
        .y_label_formatter(&|v: &f64| format!("{:.1}", v))
        .x_desc("TIME (YYYY-MM-DD)")
        .y_desc("Displacement (mm)")
        .draw()?;

    for &(ts, color) in series {
        chart
            .draw_series(
                ts.samples
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 3, color.filled())),
            )?
            .label(ts.label.as_str())
            .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));

        if let (false, Some(slope)) = (ts.trend_line.is_empty(), ts.slope) {
            chart
                .draw_series(LineSeries::new(
                    ts.trend_line.iter().copied(),
                    color.stroke_width(3),
                ))?
                .label(format!("{} Trend (Slope: {:.5} mm/year)", ts.label, slope))
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
                });
        }
    }

    if !series.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

fn draw_map<DB>(root: DrawingArea<DB, Shift>, plot: &MapPlot) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let body = root.titled(&plot.title, ("sans-serif", 28))?;
    let panels = plot.panels.len().max(1);
    let areas = match plot.layout {
        PanelLayout::Stacked => body.split_evenly((panels, 1)),
        PanelLayout::SideBySide => body.split_evenly((1, panels)),
    };
    let ((lon0, lon1), (lat0, lat1)) = plot.extent();

    for (area, panel) in areas.iter().zip(&plot.panels) {
        let width = area.dim_in_pixel().0;
        let (main, bar) = area.split_horizontally(width.saturating_sub(COLORBAR_WIDTH));

        let mut chart = ChartBuilder::on(&main)
            .caption(&panel.title, ("sans-serif", 22))
            .margin(15)
            .set_label_area_size(LabelAreaPosition::Left, 80)
            .set_label_area_size(LabelAreaPosition::Bottom, 55)
            .build_cartesian_2d(lon0..lon1, lat0..lat1)?;
        chart
            .configure_mesh()
            .x_label_formatter(&|v: &f64| format!("{:.3}", v))
            .y_label_formatter(&|v: &f64| format!("{:.3}", v))
            .x_desc("Longitude (decimal degrees)")
            .y_desc("Latitude (decimal degrees)")
            .draw()?;

        let size = plot.point_size;
        chart.draw_series(panel.points.iter().map(|&(lon, lat, value)| {
            Circle::new((lon, lat), size, panel.scale.color(value).mix(0.7).filled())
        }))?;

        for marker in &plot.stations {
            let at = (marker.longitude, marker.latitude);
            chart.draw_series(std::iter::once(TriangleMarker::new(at, 9, BLACK.filled())))?;
            chart.draw_series(std::iter::once(Text::new(
                marker.name.clone(),
                at,
                ("sans-serif", 14).into_font(),
            )))?;
        }

        draw_colorbar(&bar, &panel.scale, &panel.colorbar_label)?;
    }

    root.present()?;
    Ok(())
}

fn draw_colorbar<DB>(area: &DrawingArea<DB, Shift>, scale: &ColorScale, label: &str) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let mut chart = ChartBuilder::on(area)
        .margin_top(60)
        .margin_bottom(70)
        .margin_right(10)
        .set_label_area_size(LabelAreaPosition::Right, 70)
        .build_cartesian_2d(0.0..1.0, scale.min..scale.max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_x_axis()
        .y_label_formatter(&|v: &f64| format!("{:.1}", v))
        .y_desc(label)
        .draw()?;

    let step = (scale.max - scale.min) / COLORBAR_STEPS as f64;
    chart.draw_series((0..COLORBAR_STEPS).map(|i| {
        let lo = scale.min + step * i as f64;
        Rectangle::new(
            [(0.0, lo), (1.0, lo + step)],
            scale.color(lo + step / 2.0).filled(),
        )
    }))?;
    Ok(())
}
