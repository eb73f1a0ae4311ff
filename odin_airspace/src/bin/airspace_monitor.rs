/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::{path::PathBuf, sync::Arc};
use anyhow::{Result,anyhow};
use clap::{Parser,Subcommand};
use tracing::{info,warn};
use tracing_subscriber::EnvFilter;

use odin_airspace::{
    AirspaceConfig, AirspaceZone, PollingClient, QuotaTracker, TrackerEvent, load_config, spawn_tracker, system_clock,
    client::create_quota_store, config::region_preset_names
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "monitor aircraft in a region for restricted airspace incursions")]
pub struct Args {
    /// tracker configuration file (RON)
    #[arg(short,long, default_value = "odin_airspace/configs/airspace.ron")]
    pub config: PathBuf,

    /// default log level if RUST_LOG is not set
    #[arg(short,long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// run the tracker and log its events until Ctrl-C
    Run {
        /// restricted zone list (RON)
        #[arg(short,long)]
        zones: Option<PathBuf>,
    },
    /// do a single (quota charged) fetch to check connectivity
    Test,
    /// show the persisted quota usage
    Quota,
    /// list the names of region presets
    Regions,
}

#[tokio::main]
async fn main()->Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else( |_| EnvFilter::new( args.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter( filter).init();

    let config: AirspaceConfig = if args.config.is_file() {
        load_config( &args.config)?
    } else {
        warn!("config file {:?} not found, using defaults", args.config);
        AirspaceConfig::default()
    };
    config.validate()?;

    match &args.cmd {
        Cmd::Run{zones} => run( config, zones.as_ref()).await,
        Cmd::Test => test_connection( config).await,
        Cmd::Quota => show_quota( &config),
        Cmd::Regions => {
            for name in region_preset_names() { println!("{name}"); }
            Ok(())
        }
    }
}

async fn run (config: AirspaceConfig, zones_path: Option<&PathBuf>)->Result<()> {
    let zones: Vec<AirspaceZone> = match zones_path {
        Some(path) => load_config( path)?,
        None => Vec::new()
    };
    if zones.is_empty() { warn!("no airspace zones configured, only tracking aircraft"); }

    let config = Arc::new( config);
    let client = PollingClient::from_config( &config, system_clock())?;
    let tracker = spawn_tracker( config.clone(), client, zones)?;
    let mut rx = tracker.subscribe();

    tracker.start().await?;

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(TrackerEvent::ViolationDetected(v)) if v.alertable => warn!("ALERT {}", v),
                    Ok(TrackerEvent::ViolationResolved(v)) => {
                        info!("{} left {} after {}s", v.entity_id, v.zone_id, v.duration( chrono::Utc::now()).as_secs());
                    }
                    Ok(TrackerEvent::EntitiesUpdated{aircraft,stats}) => {
                        info!("{} aircraft ({} airborne), {} active violations, quota {}/{}",
                              aircraft.len(), stats.aircraft.airborne, stats.active_violations,
                              stats.quota.as_ref().map( |q| q.requests_used).unwrap_or(0), config.daily_limit);
                    }
                    Ok(event) => info!("{}", event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => warn!("missed {} tracker events", n),
                    Err(_) => break
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break
            }
        }
    }

    tracker.stop().await?;
    tracker.terminate().await?;
    Ok(())
}

async fn test_connection (config: AirspaceConfig)->Result<()> {
    let bbox = config.region.bounding_box()?;
    let mut client = PollingClient::from_config( &config, system_clock())?;

    match client.fetch_snapshot( &bbox).await {
        Ok(snapshot) => {
            println!("connected to {}: {} state vectors in {}", client.source_name(), snapshot.states.len(), bbox);
            let q = client.quota_snapshot();
            println!("quota: {}/{} requests used", q.requests_used, q.daily_limit);
            Ok(())
        }
        Err(e) => Err( anyhow!("connection test failed: {e}"))
    }
}

fn show_quota (config: &AirspaceConfig)->Result<()> {
    if config.quota_file.is_none() {
        println!("no quota_file configured, quota is not persisted");
    }

    let mut quota = QuotaTracker::new( create_quota_store( config), config.daily_limit, config.min_request_interval, chrono::Utc::now())?;
    let q = quota.snapshot( chrono::Utc::now());
    println!("day:       {}", q.day);
    println!("used:      {}/{} ({:.1}%)", q.requests_used, q.daily_limit, q.percent_used());
    println!("remaining: {}", q.remaining);
    if let Some(t) = q.last_request_time { println!("last:      {}", t); }
    println!("next in:   {}s", q.time_until_next_request.as_secs());
    Ok(())
}
