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
#![allow(unused)]

mod common;

use std::time::Duration;
use chrono::{DateTime,Utc};
use odin_airspace::{AircraftCategory, AircraftStore, GeoPos, StateVector, TrackingParams, records::validate_record};
use common::{local_noon, record, state_vector};

const TOLERANCE: Duration = Duration::from_secs(30);

fn secs (t: DateTime<Utc>, s: i64)->DateTime<Utc> { t + chrono::Duration::seconds(s) }

// run with "cargo test --test test_aircraft -- --nocapture"

#[test]
fn test_interpolation_between_fixes () {
    let t0 = local_noon( 2025, 6, 10);
    let mut store = AircraftStore::new( TrackingParams::default());

    store.reconcile( &[ record( "4ca001", 14.00, 46.000, 1000.0, t0) ], t0);
    let entities = store.reconcile( &[ record( "4ca001", 14.00, 46.002, 1000.0, secs(t0,30)) ], secs(t0,30));
    assert_eq!( entities.len(), 1);

    let ac = &entities[0];
    println!("{ac}");
    assert_eq!( ac.trail.len(), 2);
    assert_eq!( ac.update_count, 2);

    let fix0 = GeoPos::from_lon_lat_degrees_alt_meters( 14.00, 46.000, 1000.0);
    let fix1 = GeoPos::from_lon_lat_degrees_alt_meters( 14.00, 46.002, 1000.0);

    // end points are reproduced exactly
    assert_eq!( ac.interpolated_position_at( t0, TOLERANCE), Some(fix0));
    assert_eq!( ac.interpolated_position_at( secs(t0,30), TOLERANCE), Some(fix1));

    let mid = ac.interpolated_position_at( secs(t0,15), TOLERANCE).unwrap();
    println!("midpoint: {mid}");
    assert!( (mid.lat - 46.001).abs() < 1e-9);
    assert!( (mid.lon - 14.00).abs() < 1e-12);
    assert!( (mid.alt_meters() - 1000.0).abs() < 1e-9);

    // past t1 we hold the last fix until the tolerance runs out
    assert_eq!( ac.interpolated_position_at( secs(t0,45), TOLERANCE), Some(fix1));
    assert_eq!( ac.interpolated_position_at( secs(t0,60), TOLERANCE), Some(fix1));
    assert_eq!( ac.interpolated_position_at( secs(t0,61), TOLERANCE), None);
    assert_eq!( ac.interpolated_position_at( secs(t0,-1), TOLERANCE), None);
}

#[test]
fn test_no_interpolation_with_single_fix () {
    let t0 = local_noon( 2025, 6, 10);
    let mut store = AircraftStore::new( TrackingParams::default());

    let entities = store.reconcile( &[ record( "4ca001", 14.00, 46.000, 1000.0, t0) ], t0);
    assert_eq!( entities[0].trail.len(), 1);
    assert_eq!( entities[0].interpolated_position_at( t0, TOLERANCE), None);
}

#[test]
fn test_trail_jitter_and_bounds () {
    let t0 = local_noon( 2025, 6, 10);
    let mut store = AircraftStore::new( TrackingParams::default());

    store.reconcile( &[ record( "4ca001", 14.0, 46.0, 1000.0, t0) ], t0);

    // ~55m displacement is jitter and does not get appended, but position is still updated
    let entities = store.reconcile( &[ record( "4ca001", 14.0, 46.0005, 1000.0, secs(t0,10)) ], secs(t0,10));
    assert_eq!( entities[0].trail.len(), 1);
    assert_eq!( entities[0].position.lat, 46.0005);

    // 50 moves of ~1.1km each
    for i in 1..=50 {
        let t = secs( t0, 10 + i*10);
        let entities = store.reconcile( &[ record( "4ca001", 14.0, 46.0 + i as f64 * 0.01, 1000.0, t) ], t);
        let ac = &entities[0];
        assert!( ac.trail.len() <= 20);
        assert!( ac.trail.iter().zip( ac.trail.iter().skip(1)).all( |(a,b)| a.time <= b.time));
        assert!( ac.trail.iter().zip( ac.trail.iter().skip(1)).all( |(a,b)| a.pos.distance_to( &b.pos) > 100.0));
    }

    let ac = store.get("4ca001").unwrap();
    assert_eq!( ac.trail.len(), 20);
    assert!( (ac.trail.back().unwrap().pos.lat - 46.5).abs() < 1e-9); // newest is kept, oldest got evicted
    assert!( (ac.trail.front().unwrap().pos.lat - 46.31).abs() < 1e-9);
}

#[test]
fn test_out_of_order_fix_does_not_move_aircraft () {
    let t0 = local_noon( 2025, 6, 10);
    let mut store = AircraftStore::new( TrackingParams::default());

    store.reconcile( &[ record( "4ca001", 14.0, 46.00, 1000.0, t0) ], t0);
    store.reconcile( &[ record( "4ca001", 14.0, 46.01, 1000.0, secs(t0,30)) ], secs(t0,30));

    // a delayed record with an older contact time arrives in the next snapshot
    let entities = store.reconcile( &[ record( "4ca001", 14.0, 46.005, 2000.0, secs(t0,20)) ], secs(t0,40));
    let ac = &entities[0];
    println!("{ac}");
    assert_eq!( ac.position.lat, 46.01);
    assert_eq!( ac.position.alt_meters(), 1000.0);
    assert_eq!( ac.last_contact, secs(t0,30));
    assert_eq!( ac.trail.len(), 2);
    assert_eq!( ac.update_count, 3);
}

#[test]
fn test_altitude_source_preference () {
    let t0 = local_noon( 2025, 6, 10);

    let sv = StateVector { baro_altitude: Some(1000.0), geo_altitude: Some(1100.0), last_contact: Some(t0.timestamp()), ..state_vector( "4ca001", "TST1", 14.0, 46.0, 0.0) };
    let rec = validate_record( &sv, t0, Duration::from_secs(300)).unwrap();
    assert_eq!( rec.position_or(0.0).alt_meters(), 1100.0);

    let sv = StateVector { baro_altitude: Some(1000.0), geo_altitude: None, last_contact: Some(t0.timestamp()), ..state_vector( "4ca001", "TST1", 14.0, 46.0, 0.0) };
    let rec = validate_record( &sv, t0, Duration::from_secs(300)).unwrap();
    assert_eq!( rec.position_or(0.0).alt_meters(), 1000.0);
}

#[test]
fn test_invalid_records_never_become_entities () {
    let t0 = local_noon( 2025, 6, 10);
    let max_age = Duration::from_secs(300);

    let sv = StateVector { icao24: None, last_contact: Some(t0.timestamp()), ..state_vector( "x", "TST1", 14.0, 46.0, 1000.0) };
    assert!( validate_record( &sv, t0, max_age).is_err());

    let sv = StateVector { icao24: Some("  ".to_string()), last_contact: Some(t0.timestamp()), ..state_vector( "x", "TST1", 14.0, 46.0, 1000.0) };
    assert!( validate_record( &sv, t0, max_age).is_err());

    for (lon,lat) in [(f64::NAN, 46.0), (14.0, f64::INFINITY), (181.0, 46.0), (14.0, -91.0)] {
        let sv = StateVector { last_contact: Some(t0.timestamp()), ..state_vector( "4ca001", "TST1", lon, lat, 1000.0) };
        assert!( validate_record( &sv, t0, max_age).is_err());
    }

    let sv = StateVector { longitude: None, last_contact: Some(t0.timestamp()), ..state_vector( "4ca001", "TST1", 14.0, 46.0, 1000.0) };
    assert!( validate_record( &sv, t0, max_age).is_err());
}

#[test]
fn test_grace_period_eviction () {
    let t0 = local_noon( 2025, 6, 10);
    let mut store = AircraftStore::new( TrackingParams::default()); // 5min cleanup interval

    store.reconcile( &[ record( "4ca001", 14.0, 46.0, 1000.0, t0), record( "4ca002", 14.5, 46.2, 2000.0, t0) ], t0);
    assert_eq!( store.len(), 2);

    // 4ca002 missing for 4 min is retained
    let entities = store.reconcile( &[ record( "4ca001", 14.1, 46.0, 1000.0, secs(t0,240)) ], secs(t0,240));
    assert_eq!( entities.len(), 2);
    assert!( store.dropped_list().is_empty());

    // .. but not after 5 min
    let entities = store.reconcile( &[ record( "4ca001", 14.2, 46.0, 1000.0, secs(t0,301)) ], secs(t0,301));
    assert_eq!( entities.len(), 1);
    assert_eq!( entities[0].id.as_str(), "4ca001");
    assert_eq!( store.dropped_list().len(), 1);
    assert_eq!( store.dropped_list()[0].as_str(), "4ca002");
}

#[test]
fn test_capacity_keeps_most_recent () {
    let t0 = local_noon( 2025, 6, 10);
    let params = TrackingParams { max_tracked_entities: 3, ..TrackingParams::default() };
    let mut store = AircraftStore::new( params);

    let records: Vec<_> = (0..6).map( |i| {
        record( format!("4ca00{i}").as_str(), 14.0 + i as f64 * 0.1, 46.0, 1000.0, secs(t0, -10 * i))
    }).collect();

    let entities = store.reconcile( &records, t0);
    let mut ids: Vec<String> = entities.iter().map( |e| e.id.to_string()).collect();
    ids.sort();
    assert_eq!( ids, vec!["4ca000", "4ca001", "4ca002"]);
    assert_eq!( store.len(), 3);
}

#[test]
fn test_search_and_classification () {
    let t0 = local_noon( 2025, 6, 10);
    let mut store = AircraftStore::new( TrackingParams::default());

    let mut helo = record( "4ca003", 14.3, 46.1, 300.0, t0);
    helo.callsign = Some("S5HPA".to_string());
    helo.category = Some(8);

    let mut airliner = record( "3c6444", 14.5, 46.2, 11000.0, t0);
    airliner.callsign = Some("DLH4AB".to_string());

    store.reconcile( &[ helo, airliner ], t0);

    let hits = store.search("dlh");
    assert_eq!( hits.len(), 1);
    assert_eq!( hits[0].category, AircraftCategory::Commercial);

    let hits = store.search("4CA0");
    assert_eq!( hits.len(), 1);
    assert_eq!( hits[0].category, AircraftCategory::Helicopter);

    assert!( store.search("").is_empty());

    let stats = store.stats();
    assert_eq!( stats.total, 2);
    assert_eq!( stats.airborne, 2);
    assert_eq!( stats.by_category.get( &AircraftCategory::Helicopter), Some(&1));
}
