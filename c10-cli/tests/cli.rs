//! End-to-end runs of the c10-cli binary

use c10_decoder::{Bus, Decoder, Message, Ms1553Message, PacketBuilder, TimeF1};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn c10(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_c10-cli"))
        .args(args)
        .output()
        .unwrap()
}

fn write_recording(path: &Path) {
    let time = NaiveDate::from_ymd_opt(2020, 5, 6)
        .unwrap()
        .and_hms_opt(7, 8, 9)
        .unwrap();
    let packets = [
        PacketBuilder::time_f1(1, 0, &TimeF1::date(time)).build(),
        PacketBuilder::ms1553(
            5,
            0,
            &[
                Ms1553Message::new(10_000_000, Bus::A, &[0x0821, 0x1234]),
                Ms1553Message::new(20_000_000, Bus::B, &[0x0C22, 0x4321]),
            ],
        )
        .with_filler(8)
        .build(),
    ];
    fs::write(path, packets.concat()).unwrap();
}

#[test]
fn grep_wildcard_prints_command_words() {
    let dir = tempfile::tempdir().unwrap();
    let recording = dir.path().join("flight.c10");
    write_recording(&recording);

    let output = c10(&["-q", "grep", "*", "-c", "5", dir.path().to_str().unwrap()]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Searching for * in channel #5 in 1 files...\n"));
    assert!(stdout.contains(&format!("{}\n0x821\n0xc22\n", recording.display())));
    assert!(stdout.ends_with("\nfinished\n"));
}

#[test]
fn grep_exact_writes_result_file() {
    let dir = tempfile::tempdir().unwrap();
    let recording = dir.path().join("flight.c10");
    write_recording(&recording);
    let results = dir.path().join("results.txt");

    let args = [
        "-q",
        "grep",
        "0x1234",
        "-w",
        "1",
        "-o",
        results.to_str().unwrap(),
        recording.to_str().unwrap(),
    ];
    assert!(c10(&args).status.success());
    assert_eq!(
        fs::read_to_string(&results).unwrap(),
        format!("{}\n    2020-05-06 07:08:10.000000\n", recording.display())
    );

    // Existing output file without -f
    let output = c10(&args);
    assert!(!output.status.success());

    let mut forced = args.to_vec();
    forced.push("-f");
    assert!(c10(&forced).status.success());
}

#[test]
fn grep_rejects_invalid_value() {
    let output = c10(&["grep", "0xZZ", "whatever.c10"]);
    assert!(!output.status.success());
}

#[test]
fn allbus_rewrites_and_refuses_existing_destination() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in.c10");
    let dst = dir.path().join("out.c10");
    write_recording(&src);

    assert!(c10(&["-q", "allbus", src.to_str().unwrap(), dst.to_str().unwrap(), "-b"])
        .status
        .success());
    assert_eq!(fs::metadata(&dst).unwrap().len(), fs::metadata(&src).unwrap().len());

    let buses: Vec<Bus> = Decoder::new()
        .open(&dst)
        .unwrap()
        .flat_map(|packet| {
            packet
                .unwrap()
                .messages()
                .filter_map(|m| match m.unwrap() {
                    Message::Ms1553(m) => Some(m.bus()),
                    Message::Arinc429(_) => None,
                })
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(buses, vec![Bus::B, Bus::B]);

    let before = fs::read(&dst).unwrap();
    let output = c10(&["-q", "allbus", src.to_str().unwrap(), dst.to_str().unwrap()]);
    assert!(!output.status.success());
    assert_eq!(fs::read(&dst).unwrap(), before);

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(stderr.lines().count(), 1);
    assert!(stderr.contains("Destination file exists"));
    assert!(stderr.contains(&dst.display().to_string()));
}

#[test]
fn grep_wildcard_to_file_lists_searched_files() {
    let dir = tempfile::tempdir().unwrap();
    let recording = dir.path().join("flight.c10");
    write_recording(&recording);
    let results = dir.path().join("results.txt");

    let output = c10(&[
        "-q",
        "grep",
        "*",
        "-o",
        results.to_str().unwrap(),
        recording.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    assert_eq!(
        fs::read_to_string(&results).unwrap(),
        format!("{}\n", recording.display())
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("0x821\n0xc22\n"));
}
