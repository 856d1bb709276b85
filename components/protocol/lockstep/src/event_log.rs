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

//! Macros for generating parseable event log messages

#[macro_export]
macro_rules! event_log {
    ($uptime:expr,$kind:expr,$content:expr) => {
        info!("${};{};{}", $uptime, $kind, $content);
    };
}

#[macro_export]
macro_rules! event_log_state {
    ($uptime:expr,$new_state:expr,$score:expr) => {
        info!("${};state;{{\"state\":\"{}\",\"score\":{}}}", $uptime, $new_state, $score);
    };
}

#[macro_export]
macro_rules! event_log_hop {
    ($uptime:expr,$suggestion:expr) => {
        event_log!($uptime, "hop", $suggestion);
    };
}

#[macro_export]
macro_rules! event_log_reset {
    ($uptime:expr) => {
        info!("${};reset;{{}}", $uptime);
    };
}
