// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One-shot command client for the ilsim server.
//!
//! Joins its arguments into a single command line, appends CR LF, sends
//! it over TCP and prints the reply:
//!
//! ```bash
//! ilsim-client M0
//! ilsim-client SR,01,037
//! ilsim-client --host 10.0.0.5 --port 9999 SW,01,136,+000000002
//! ```

use clap::Parser;
use std::io::{Read, Write};
use std::net::TcpStream;

/// ilsim client - send one command to the simulated sensor bus
#[derive(Parser, Debug)]
#[command(name = "ilsim-client")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(long, default_value = "9999")]
    port: u16,

    /// Command to send; multiple words are joined with spaces
    #[arg(required = true)]
    command: Vec<String>,
}

fn main() {
    let args = Args::parse();
    let line = format!("{}\r\n", args.command.join(" "));
    let addr = format!("{}:{}", args.host, args.port);

    let mut stream = match TcpStream::connect(&addr) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Connection to {} failed: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = stream.write_all(line.as_bytes()) {
        eprintln!("Send failed: {}", e);
        std::process::exit(1);
    }

    let mut buf = [0u8; 1024];
    let received = match stream.read(&mut buf) {
        Ok(n) => String::from_utf8_lossy(&buf[..n]).into_owned(),
        Err(e) => {
            eprintln!("Receive failed: {}", e);
            std::process::exit(1);
        }
    };

    println!("Sent:     {:?}", line);
    println!("Received: {:?}", received);
}
