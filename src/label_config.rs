//! Label Studio time-series config generated from a CSV header.

use log::{debug, info};
use quick_xml::escape::escape;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const CHANNEL_INDENT: usize = 2;

/// Build the config for `csv_path`. The first header column is the time
/// column, every other column becomes a channel with a random stroke colour.
pub fn create_config(csv_path: &Path, seed: Option<u64>) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(csv_path)?;
    let header = reader.headers()?.clone();
    let mut columns = header.iter();
    let time_column = match columns.next() {
        Some(c) if !c.trim().is_empty() => c.trim(),
        _ => return Err(Error::EmptyInput(csv_path.to_path_buf())),
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let channels: Vec<String> = columns
        .map(|c| create_channel(c.trim(), rng.gen_range(0..=0xFF_FFFF)))
        .collect();
    let indent = "\t".repeat(CHANNEL_INDENT);

    Ok(format!(
        r##"
<View>
    <Header value="Time Series from CSV" style="font-weight: normal">
    </Header>
    <TimeSeriesLabels name="label" toName="ts">
      <Label value="anomaly" background="#55f">
      </Label>
    </TimeSeriesLabels>
    <TimeSeries name="ts" timeColumn="{time}" valueType="url" value="$csv" sep="," overviewChannels="velocity">
        {channels}
    </TimeSeries>
</View>
"##,
        time = escape(time_column),
        channels = channels.join(&format!("\n{}", indent)),
    ))
}

/// One `<Channel>` element with a `#rrggbb` stroke colour
pub fn create_channel(column: &str, color: u32) -> String {
    format!(
        r##"<Channel column="{}" strokeColor="#{:06x}"> </Channel>"##,
        escape(column),
        color & 0xFF_FFFF
    )
}

/// Generate the config and replace `dest` with it
pub fn write_config(csv_path: &Path, dest: &Path, seed: Option<u64>) -> Result<()> {
    let config = create_config(csv_path, seed)?;
    debug!("{}", config);
    if dest.exists() {
        fs::remove_file(dest)?;
    }
    fs::write(dest, config)?;
    info!("Wrote Label Studio config to {}", dest.display());
    Ok(())
}
