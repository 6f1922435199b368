// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::{anyhow, Context, Result},
    clap::{Arg, ArgMatches, Command},
    log::{debug, info, warn, LevelFilter},
    mobileprovision_extract::{decode_profile, extension_for, render_profile, OutputFormat},
    std::{
        path::{Path, PathBuf},
        str::FromStr,
    },
};

const ABOUT: &str = "\
Extract information from an Apple mobile provisioning profile.

The profile's signed-data envelope is stripped and the embedded plist is
rendered as plain text, XML or an XML plist.

The signature over the profile is NOT verified. Do not treat the output
as authentic.
";

const FORMATS: [&str; 4] = ["txt", "text", "xml", "plist"];

/// Where rendered output ends up.
fn output_path(args: &ArgMatches, input: &Path, format: OutputFormat) -> Result<Option<PathBuf>> {
    if let Some(path) = args.value_of("output") {
        return Ok(Some(PathBuf::from(path)));
    }

    if let Some(dir) = args.value_of("output_dir") {
        let stem = input
            .file_stem()
            .ok_or_else(|| anyhow!("unable to derive file name from {}", input.display()))?;

        // Only the last extension is replaced: My.App.mobileprovision is My.App.txt.
        let mut file_name = stem.to_os_string();
        file_name.push(".");
        file_name.push(extension_for(format));

        return Ok(Some(PathBuf::from(dir).join(file_name)));
    }

    Ok(None)
}

fn command_extract(args: &ArgMatches) -> Result<()> {
    let input = PathBuf::from(
        args.value_of("input")
            .ok_or_else(|| anyhow!("input path not specified"))?,
    );
    let format = OutputFormat::from_str(args.value_of("format").unwrap_or("txt"))?;
    let tool_version = if args.is_present("no_version") {
        None
    } else {
        Some(env!("CARGO_PKG_VERSION"))
    };

    debug!("reading {}", input.display());
    let data =
        std::fs::read(&input).with_context(|| format!("reading {}", input.display()))?;

    let profile = decode_profile(&data)
        .with_context(|| format!("decoding provisioning profile {}", input.display()))?;

    for (i, cert) in profile.developer_certificates.iter().enumerate() {
        if cert.common_name().is_none() {
            warn!(
                "unable to derive common name of developer certificate #{}",
                i
            );
        }
    }

    let rendered = render_profile(
        &profile,
        format,
        &input.display().to_string(),
        tool_version,
    );

    match output_path(args, &input, format)? {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("creating {}", parent.display()))?;
                }
            }

            info!("writing {} output to {}", format, path.display());
            std::fs::write(&path, rendered.as_bytes())
                .with_context(|| format!("writing {}", path.display()))?;
        }
        None => {
            print!("{}", rendered);
        }
    }

    Ok(())
}

fn app() -> Command<'static> {
    Command::new("mpextract")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract information from Apple mobile provisioning profiles")
        .long_about(ABOUT)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .short('f')
                .takes_value(true)
                .possible_values(FORMATS)
                .ignore_case(true)
                .default_value("txt")
                .help("Output format"),
        )
        .arg(
            Arg::new("no_version")
                .long("no-version")
                .help("Do not record the tool version in the output header"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .takes_value(true)
                .conflicts_with("output_dir")
                .help("File to write output to"),
        )
        .arg(
            Arg::new("output_dir")
                .long("output-dir")
                .takes_value(true)
                .help("Directory to write <input stem>.<format extension> into"),
        )
        .arg(
            Arg::new("input")
                .required(true)
                .help("Path to .mobileprovision file to read"),
        )
}

fn main_impl() -> Result<()> {
    let matches = app().get_matches();

    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    command_extract(&matches)
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            1
        }
    };

    std::process::exit(exit_code)
}

#[cfg(test)]
mod test {
    use {
        super::*,
        mobileprovision_extract::{property_list, Value},
    };

    const PROFILE_DER: &[u8] = include_bytes!("testdata/profile.mobileprovision");

    fn parse(args: &[&str]) -> clap::Result<ArgMatches> {
        app().try_get_matches_from(std::iter::once("mpextract").chain(args.iter().copied()))
    }

    fn temp_dir() -> Result<(tempfile::TempDir, PathBuf)> {
        let td = tempfile::Builder::new()
            .prefix("mobileprovision-extract-")
            .tempdir()?;
        let path = td.path().to_path_buf();

        Ok((td, path))
    }

    #[test]
    fn output_paths() -> Result<()> {
        let input = Path::new("profiles/My.App.mobileprovision");

        let args = parse(&["--output-dir", "out", "profiles/My.App.mobileprovision"])?;
        assert_eq!(
            output_path(&args, input, OutputFormat::Text)?,
            Some(PathBuf::from("out").join("My.App.txt"))
        );
        assert_eq!(
            output_path(&args, input, OutputFormat::Plist)?,
            Some(PathBuf::from("out").join("My.App.plist"))
        );
        assert_eq!(
            output_path(&args, Path::new("embedded"), OutputFormat::Xml)?,
            Some(PathBuf::from("out").join("embedded.xml"))
        );

        let args = parse(&["-o", "profile.txt", "profiles/My.App.mobileprovision"])?;
        assert_eq!(
            output_path(&args, input, OutputFormat::Xml)?,
            Some(PathBuf::from("profile.txt"))
        );

        let args = parse(&["profiles/My.App.mobileprovision"])?;
        assert_eq!(output_path(&args, input, OutputFormat::Text)?, None);

        let args = parse(&["--output-dir", "out", ".."])?;
        assert!(output_path(&args, Path::new(".."), OutputFormat::Text).is_err());

        Ok(())
    }

    #[test]
    fn argument_parsing() -> Result<()> {
        let args = parse(&["embedded.mobileprovision"])?;
        assert_eq!(args.value_of("format"), Some("txt"));
        assert!(!args.is_present("no_version"));
        assert_eq!(args.value_of("input"), Some("embedded.mobileprovision"));

        for (value, format) in [
            ("txt", OutputFormat::Text),
            ("text", OutputFormat::Text),
            ("XML", OutputFormat::Xml),
            ("Plist", OutputFormat::Plist),
        ] {
            let args = parse(&["--format", value, "embedded.mobileprovision"])?;
            assert_eq!(OutputFormat::from_str(args.value_of("format").unwrap())?, format);
        }

        let args = parse(&["-vv", "--no-version", "embedded.mobileprovision"])?;
        assert_eq!(args.occurrences_of("verbose"), 2);
        assert!(args.is_present("no_version"));

        assert!(parse(&["--format", "json", "embedded.mobileprovision"]).is_err());
        assert!(parse(&["-o", "a.txt", "--output-dir", "out", "embedded.mobileprovision"]).is_err());
        assert!(parse(&[]).is_err());

        Ok(())
    }

    #[test]
    fn extract_to_output_dir() -> Result<()> {
        let (_temp, td) = temp_dir()?;

        let input = td.join("My.App.mobileprovision");
        std::fs::write(&input, PROFILE_DER)?;
        let out = td.join("out");

        let args = parse(&[
            "--format",
            "plist",
            "--no-version",
            "--output-dir",
            out.to_str().unwrap(),
            input.to_str().unwrap(),
        ])?;
        command_extract(&args)?;

        let root = property_list::decode(&std::fs::read(out.join("My.App.plist"))?)?;
        let header = root.get("header").and_then(|v| v.as_dictionary()).unwrap();
        assert_eq!(header.get("version"), None);
        assert_eq!(
            header.get("originalFile"),
            Some(&Value::from(input.display().to_string()))
        );

        let output = td.join("profile.txt");
        let args = parse(&["-o", output.to_str().unwrap(), input.to_str().unwrap()])?;
        command_extract(&args)?;

        let text = std::fs::read_to_string(&output)?;
        assert!(text.starts_with(&format!(
            "Generator: mobileprovision-extract\nVersion: {}\n",
            env!("CARGO_PKG_VERSION")
        )));
        assert!(text.contains("\nUUID: 0f2a6c1e-5b7d-4e39-9a8c-3d1e2f4a5b6c\n"));

        Ok(())
    }

    #[test]
    fn extract_errors_carry_context() -> Result<()> {
        let (_temp, td) = temp_dir()?;

        let missing = td.join("missing.mobileprovision");
        let err = command_extract(&parse(&[missing.to_str().unwrap()])?).unwrap_err();
        assert!(format!("{:#}", err).starts_with(&format!("reading {}", missing.display())));

        let garbage = td.join("garbage.mobileprovision");
        std::fs::write(&garbage, b"garbage")?;
        let err = command_extract(&parse(&[garbage.to_str().unwrap()])?).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.starts_with(&format!(
            "decoding provisioning profile {}: malformed signed-data envelope",
            garbage.display()
        )));

        Ok(())
    }
}
