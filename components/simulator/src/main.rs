//  _____       ______   ____
// |_   _|     |  ____|/ ____|  Institute of Embedded Systems
//   | |  _ __ | |__  | (___    Zurich University of Applied Sciences
//   | | | '_ \|  __|  \___ \   8401 Winterthur, Switzerland
//  _| |_| | | | |____ ____) |
// |_____|_| |_|______|_____/
//
// Copyright 2025 Institute of Embedded Systems at Zurich University of Applied Sciences.
// All rights reserved.
// SPDX-License-Identifier: MIT

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rand::{RngCore, SeedableRng};
use std::env;

use lockstep::{
    FhssConfig, LinkSession, RadioId, TimeMs, DOMAIN_EU_868, DOMAIN_FCC_915, DOMAIN_ISM_2G4,
};

mod logger;
mod sim;

use crate::sim::*;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut rng_seed: u64 = 0;
    let mut simulation_minutes: usize = 5;
    let mut per_ppt: u32 = 10;
    let mut domain = DOMAIN_FCC_915;
    let mut dual_band = false;
    let mut jam_start_s: TimeMs = 60;
    let mut jam_stop_s: TimeMs = 120;
    let mut jam_width_khz: u32 = 300;

    for chunk in args[1..].chunks_exact(2) {
        let (arg, val) = (&chunk[0], &chunk[1]);
        match arg.as_str() {
            "--seed" => {
                rng_seed = val.parse().expect("invalid rng seed");
            }
            "--time_min" => {
                simulation_minutes = val.parse().expect("invalid number of simulation minutes");
            }
            "--per_ppt" => {
                per_ppt = val.parse().expect("invalid packet error rate");
            }
            "--domain" => {
                domain = parse_domain(val);
            }
            "--dual" => {
                dual_band = val.parse::<u8>().expect("invalid dual flag") != 0;
            }
            "--jam_start_s" => {
                jam_start_s = val.parse().expect("invalid jam start");
            }
            "--jam_stop_s" => {
                jam_stop_s = val.parse().expect("invalid jam stop");
            }
            "--jam_width_khz" => {
                jam_width_khz = val.parse().expect("invalid jam width");
            }
            _ => panic!("unknown argument: {}", arg),
        }
    }

    logger::init(log::Level::Info).unwrap();

    let mut rng = get_rng(rng_seed);
    let mut session = build_session(domain, dual_band, dual_band, &mut rng);

    // the jammer parks on the link's starting frequency
    let jammer = Jammer {
        center_hz: session.initial_frequency(RadioId::Radio1),
        half_width_hz: jam_width_khz * 500,
        active_from_ms: jam_start_s * 1000,
        active_until_ms: jam_stop_s * 1000,
    };

    let outcome = run(&mut session, simulation_minutes, per_ppt, &jammer, &mut rng);

    println!(
        "{} packets, {} bad, {} hops, {} alerts, final state {}, lock-step {}",
        outcome.packets,
        outcome.bad_packets,
        outcome.hops,
        outcome.domain_alerts,
        outcome.final_state,
        outcome.lock_step
    );
}

fn parse_domain(name: &str) -> FhssConfig {
    match name {
        "eu868" => DOMAIN_EU_868,
        "fcc915" => DOMAIN_FCC_915,
        "ism2g4" => DOMAIN_ISM_2G4,
        _ => panic!("unknown domain: {}", name),
    }
}

fn get_rng(rng_seed: u64) -> impl RngCore {
    println!("RNG seed: {rng_seed:#x}");
    rand_chacha::ChaCha8Rng::seed_from_u64(rng_seed)
}

fn build_session(
    domain: FhssConfig,
    dual_band: bool,
    allow_group_switch: bool,
    rng: &mut impl RngCore,
) -> LinkSession<SIM_RING> {
    let secondary = dual_band.then_some(DOMAIN_EU_868);
    LinkSession::new(domain, secondary, 0, &sim_aj_config(allow_group_switch), rng)
        .expect("invalid session configuration")
}

#[cfg(test)]
mod tests {
    use crate::*;
    use lockstep::JamState;

    #[test]
    fn quiet_link_stays_unjammed() {
        let mut rng = get_rng(0);
        let mut session = build_session(DOMAIN_FCC_915, false, false, &mut rng);
        let outcome = run(&mut session, 3, 0, &Jammer::silent(), &mut rng);

        assert_eq!(outcome.final_state, JamState::NotJammed);
        assert_eq!(outcome.bad_packets, 0);
        assert_eq!(outcome.hops, 0);
    }

    #[test]
    fn background_noise_alone_does_not_hop() {
        let mut rng = get_rng(1);
        let mut session = build_session(DOMAIN_FCC_915, false, false, &mut rng);
        // 1% packet error rate stays far below the 30% threshold
        let outcome = run(&mut session, 3, 10, &Jammer::silent(), &mut rng);

        assert_eq!(outcome.final_state, JamState::NotJammed);
        assert!(outcome.bad_packets > 0);
        assert_eq!(outcome.hops, 0);
    }

    #[test]
    fn pinned_jammer_forces_hop_and_recovery() {
        let mut rng = get_rng(2);
        let mut session = build_session(DOMAIN_FCC_915, false, false, &mut rng);
        let jammer = Jammer {
            center_hz: session.initial_frequency(RadioId::Radio1),
            half_width_hz: 150_000, // narrower than the 600 kHz channel spacing
            active_from_ms: 60_000,
            active_until_ms: 120_000,
        };
        let outcome = run(&mut session, 3, 0, &jammer, &mut rng);

        assert!(outcome.hops >= 1);
        assert!(outcome.bad_packets > 0);
        assert!(outcome.lock_step);
        // the link hopped off the jammed channel and the state decayed again
        assert_eq!(outcome.final_state, JamState::NotJammed);
        assert!(session.synced_index() > 0);
    }

    #[test]
    fn wideband_jammer_drives_a_group_switch() {
        let mut rng = get_rng(3);
        let mut session = build_session(DOMAIN_FCC_915, true, true, &mut rng);
        assert_eq!(session.active_band().config().domain, "FCC915");

        let jammer = Jammer::wideband(&DOMAIN_FCC_915, 60_000, 120_000);
        let outcome = run(&mut session, 3, 0, &jammer, &mut rng);

        assert!(outcome.hops >= 1);
        assert!(outcome.lock_step);
        assert_eq!(session.active_band().config().domain, "EU868");
        assert_eq!(outcome.final_state, JamState::NotJammed);
    }

    #[test]
    fn sustained_jam_raises_domain_alerts() {
        let mut rng = get_rng(4);
        let mut session = build_session(DOMAIN_ISM_2G4, false, false, &mut rng);
        let jammer = Jammer::wideband(&DOMAIN_ISM_2G4, 60_000, 90_000);
        let outcome = run(&mut session, 2, 0, &jammer, &mut rng);

        assert!(outcome.domain_alerts >= 1);
    }

    #[test]
    fn same_seed_is_reproducible() {
        let jammer = Jammer {
            center_hz: 915_000_000,
            half_width_hz: 2_000_000,
            active_from_ms: 30_000,
            active_until_ms: 60_000,
        };

        let mut rng_a = get_rng(7);
        let mut session_a = build_session(DOMAIN_FCC_915, false, false, &mut rng_a);
        let outcome_a = run(&mut session_a, 2, 50, &jammer, &mut rng_a);

        let mut rng_b = get_rng(7);
        let mut session_b = build_session(DOMAIN_FCC_915, false, false, &mut rng_b);
        let outcome_b = run(&mut session_b, 2, 50, &jammer, &mut rng_b);

        assert_eq!(outcome_a, outcome_b);
    }
}
