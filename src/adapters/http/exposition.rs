//! Exposition Adapter - Registry Snapshot to Text Format
//!
//! Converts registry snapshots into Prometheus `MetricFamily` protos
//! and encodes them with the crate's `TextEncoder`, which takes care of
//! HELP and label value escaping. Families without series are left out
//! entirely; nothing is ever reported as an implicit zero.

use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};

use crate::domain::MetricSnapshot;

/// Content type of the rendered body.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

/// Render snapshots in the text exposition format.
pub fn render(snapshot: &[MetricSnapshot]) -> Result<Vec<u8>, prometheus::Error> {
    let families: Vec<MetricFamily> = snapshot
        .iter()
        .filter(|m| !m.series.is_empty())
        .map(to_family)
        .collect();

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    Ok(buffer)
}

fn to_family(snapshot: &MetricSnapshot) -> MetricFamily {
    let descriptor = &snapshot.descriptor;

    let mut family = MetricFamily::default();
    family.set_name(descriptor.name.clone());
    family.set_help(descriptor.help.clone());
    family.set_field_type(MetricType::GAUGE);

    for series in &snapshot.series {
        let mut metric = Metric::default();
        for (name, value) in descriptor.label_names.iter().zip(&series.label_values) {
            let mut pair = LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            metric.mut_label().push(pair);
        }

        let mut gauge = Gauge::default();
        gauge.set_value(series.value);
        metric.set_gauge(gauge);

        family.mut_metric().push(metric);
    }

    family
}
