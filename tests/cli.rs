use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

fn test_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::remove_dir_all(&dir).ok();
    fs::create_dir_all(&dir).expect("failed to create test directory");
    dir
}

fn run_bin(args: &[&str]) -> std::process::Output {
    let bin = PathBuf::from(env!("CARGO_BIN_EXE_calib"));
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to execute command")
}

fn run_ok(args: &[&str]) -> String {
    let output = run_bin(args);
    let stdout_str = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr_str = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "failed to run binary with {args:?}\nstdout:\n{stdout_str}\nstderr:\n{stderr_str}\n"
    );
    stdout_str
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("failed to convert path to string")
}

#[test]
fn synth_then_run_is_reproducible() {
    let dir = test_dir("synth_then_run");
    let panel = dir.join("panel.csv");
    let records = dir.join("records.csv");
    let manifest = dir.join("manifest.csv");

    run_ok(&["synth", "--groups", "12", "--periods", "40", "--seed", "7", "--out", path_str(&panel)]);

    let run_args = [
        "run",
        "--panel",
        path_str(&panel),
        "--preset",
        "quantity-theory-open",
        "--out",
        path_str(&records),
        "--manifest",
        path_str(&manifest),
    ];
    run_ok(&run_args);
    let first_records = fs::read_to_string(&records).expect("records missing");
    let first_manifest = fs::read_to_string(&manifest).expect("manifest missing");

    assert!(first_records.starts_with(
        "group,observations,start,end,money growth,inflation,gdp growth,nominal interest rate,exchange rate depreciation\n"
    ));
    assert!(first_manifest.starts_with("group,reason,action,detail\n"));
    // Every group is either a record or a skipped manifest entry.
    let calibrated = first_records.lines().count() - 1;
    let skipped = first_manifest.lines().filter(|l| l.contains(",group-skipped,")).count();
    assert_eq!(calibrated + skipped, 12);

    run_ok(&run_args);
    assert_eq!(fs::read_to_string(&records).unwrap(), first_records);
    assert_eq!(fs::read_to_string(&manifest).unwrap(), first_manifest);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn run_with_config_and_lookup() {
    let dir = test_dir("config_and_lookup");
    let panel = dir.join("panel.csv");
    let config = dir.join("config.toml");
    let lookup = dir.join("lookup.csv");
    let manifest = dir.join("manifest.csv");

    let mut csv = String::from("country,year,broad money,lending rate\n");
    for year in 1990..2002 {
        csv += &format!("Aland,{year},100,5\n");
    }
    for year in 1990..1994 {
        csv += &format!("Borduria,{year},100,4\n");
    }
    csv += "WLD,1990,1,1\n";
    fs::write(&panel, csv).expect("failed to write panel");

    let toml = String::new()
        + "min_length = 10\n"
        + "exclude = [\"WLD\"]\n"
        + "\n"
        + "[[statistic]]\n"
        + "indicator = \"broad money\"\n"
        + "column = \"money growth\"\n"
        + "kind = \"growth\"\n"
        + "\n"
        + "[[statistic]]\n"
        + "indicator = \"lending rate\"\n"
        + "column = \"rate\"\n"
        + "kind = \"average\"\n"
        + "scale = 0.01\n";
    fs::write(&config, toml).expect("failed to write config");
    fs::write(&lookup, "country,oecd\nAland,yes\n").expect("failed to write lookup");

    let stdout = run_ok(&[
        "run",
        "--panel",
        path_str(&panel),
        "--config",
        path_str(&config),
        "--lookup",
        path_str(&lookup),
        "--manifest",
        path_str(&manifest),
    ]);
    assert_eq!(stdout, "group,observations,start,end,money growth,rate,oecd\nAland,12,1990,2001,0,0.05,yes\n");

    let manifest = fs::read_to_string(&manifest).expect("manifest missing");
    assert_eq!(
        manifest,
        "group,reason,action,detail\n\
         Borduria,insufficient-window,group-skipped,\"longest window has 4 periods, 10 required\"\n\
         WLD,excluded,group-skipped,group is on the exclusion list\n"
    );

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn preset_prints_toml() {
    let stdout = run_ok(&["preset", "quantity-theory"]);
    assert!(stdout.contains("min_length = 10"));
    assert!(stdout.contains("[[statistic]]"));
    assert!(stdout.contains("money growth"));
}

#[test]
fn hp_filters_longest_window() {
    let dir = test_dir("hp_filter");
    let panel = dir.join("panel.csv");

    let mut csv = String::from("group,period,gdp\n");
    csv += "A,1999Q4,\n";
    for i in 0..12 {
        let year = 2000 + i / 4;
        let quarter = i % 4 + 1;
        csv += &format!("A,{year}Q{quarter},{}\n", 10.0 + i as f64);
    }
    fs::write(&panel, csv).expect("failed to write panel");

    let stdout = run_ok(&["hp", "--panel", path_str(&panel), "--group", "A", "--indicator", "GDP"]);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("period,value,trend,cycle"));
    let first = lines.next().expect("no decomposition rows");
    assert!(first.starts_with("2000Q1,10,"));
    assert_eq!(lines.count(), 11);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn cycle_writes_trend_tables() {
    let dir = test_dir("cycle");
    let panel = dir.join("panel.csv");
    let out = dir.join("out");

    let mut csv = String::from("group,period,deflator,population,gdp,consumption,investment,depreciation,hours,tbill\n");
    for t in 0..24 {
        let year = 2000 + t / 4;
        let quarter = t % 4 + 1;
        let price = 100.0 * 1.005f64.powi(t);
        let nominal = 1000.0 * 1.01f64.powi(t) * price / 100.0;
        csv += &format!(
            "USA,{year}Q{quarter},{price},{},{nominal},{},{},{},{},4\n",
            200.0 * 1.001f64.powi(t),
            0.7 * nominal,
            0.2 * nominal,
            0.15 * nominal,
            100.0 * 1.002f64.powi(t)
        );
    }
    fs::write(&panel, csv).expect("failed to write panel");

    run_ok(&["cycle", "--panel", path_str(&panel), "--group", "USA", "--out-dir", path_str(&out)]);

    let rbc = fs::read_to_string(out.join("rbc_data_actual_trend.csv")).expect("rbc table missing");
    let mut lines = rbc.lines();
    assert_eq!(
        lines.next(),
        Some("period,gdp,gdp_trend,consumption,consumption_trend,investment,investment_trend,hours,hours_trend,capital,capital_trend,tfp,tfp_trend")
    );
    assert!(lines.next().expect("no rows").starts_with("2000Q1,5000,"));
    assert_eq!(lines.count(), 23);

    let with_cycle = fs::read_to_string(out.join("business_cycle_data_actual_trend_cycle.csv")).expect("full table missing");
    assert!(with_cycle.lines().next().expect("empty table").ends_with(",t_bill_3mo,t_bill_3mo_trend,t_bill_3mo_cycle"));
    assert!(out.join("rbc_data_actual_trend_cycle.csv").exists());
    assert!(out.join("business_cycle_data_actual_trend.csv").exists());

    let calibration = fs::read_to_string(out.join("calibration.csv")).expect("calibration missing");
    assert!(calibration.starts_with("parameter,value\nalpha,0.35\n"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn cross_section_keeps_complete_groups() {
    let dir = test_dir("cross_section");
    let panel = dir.join("panel.csv");
    let out = dir.join("out");

    let mut csv = String::from("group,year,gdp,labor,human capital,physical capital,real gdp,population\n");
    for year in 1958..1963 {
        csv += &format!("Aland,{year},100,4,2.5,300,90,3\n");
        let capital = if year == 1962 { String::new() } else { "200".to_string() };
        let real_gdp = if year == 1961 { String::new() } else { "40".to_string() };
        csv += &format!("Borduria,{year},50,2,2,{capital},{real_gdp},2\n");
    }
    fs::write(&panel, csv).expect("failed to write panel");

    run_ok(&["cross-section", "--panel", path_str(&panel), "--out-dir", path_str(&out)]);

    let production = fs::read_to_string(out.join("cross_country_production.csv")).expect("production missing");
    assert_eq!(
        production,
        "group,period,gdp,labor,human capital,physical capital\nAland,1962,100,4,2.5,300\n"
    );
    let per_capita = fs::read_to_string(out.join("cross_country_gdp_pc.csv")).expect("per-capita missing");
    assert_eq!(per_capita.lines().next(), Some("period,Aland"));
    assert_eq!(per_capita.lines().nth(1), Some("1960,30"));
    assert_eq!(per_capita.lines().count(), 4);
    let per_worker = fs::read_to_string(out.join("cross_country_gdp_pw.csv")).expect("per-worker missing");
    assert_eq!(per_worker.lines().nth(1), Some("1960,22.5"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_inputs_exit_with_input_code() {
    let output = run_bin(&["run", "--panel", "/nonexistent/panel.csv"]);
    assert_eq!(output.status.code(), Some(2));
}
