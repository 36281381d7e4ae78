use std::io::IsTerminal as _;

use anyhow::Result;
use clap::ColorChoice;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{format::FmtSpan, Layer as FmtLayer},
    layer::SubscriberExt as _,
    Layer as _, Registry,
};

use crate::Options;

pub(crate) fn set_up(options: &Options) -> Result<()> {
    let level = if options.verbose {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };

    let span_events = if options.verbose {
        // include enter/exit events for detailed tracing
        FmtSpan::FULL
    } else {
        // announce what we do and when we're done
        FmtSpan::NEW | FmtSpan::CLOSE
    };

    let ansi = match options.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stderr().is_terminal(),
    };

    // Stdout is reserved for the task's output context.
    let fmt_layer = FmtLayer::new()
        .with_span_events(span_events)
        .with_ansi(ansi)
        .with_writer(std::io::stderr);
    let subscriber =
        Registry::default().with(fmt_layer.with_filter(LevelFilter::from_level(level)));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("failed to set up tracing: {}", e))
}
