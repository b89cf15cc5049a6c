use std::process::Command;

fn opm_render() -> Command {
    Command::new(env!("CARGO_BIN_EXE_opm-render"))
}

#[test]
fn renders_reference_tone_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");

    let output = opm_render().arg(&path).output().unwrap();
    assert!(output.status.success());
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Generating 440Hz tone for 3 seconds..."));
    assert!(stdout.contains("Generating 167790 samples at 55930 Hz..."));
    for percent in (0..100).step_by(10) {
        assert!(stdout.contains(&format!("Progress: {percent}%")), "{percent}%");
    }
    assert!(stdout.contains("Done! WAV file saved to"));

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 44 + 167_790 * 4);

    let mut reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 55_930);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.duration(), 167_790);
    // The reference voice has both output enables cleared
    assert!(reader.samples::<i16>().all(|s| s.unwrap() == 0));
}

#[test]
fn unwritable_output_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("tone.wav");

    let output = opm_render().arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Progress:"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Could not open output file"));
    assert!(!path.exists());
}
