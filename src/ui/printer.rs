use colored::Colorize;

use crate::core::{models::HostAssessment, state::RunState};
use crate::fingerprint::cvedb;
use crate::reporters::writer::ReportPaths;

pub fn print_summary(records: &[HostAssessment], state: &RunState, paths: &ReportPaths) {
    for record in records {
        print_host(record);
    }

    println!("{}", "═══════════════════════════════════════".green().bold());
    println!("{}", "cctvscan run complete".green().bold());
    println!("{}", "═══════════════════════════════════════".green().bold());
    println!("{}: {}", "Run ID".cyan().bold(), state.run_id);
    println!(
        "{}: {} target(s), {} host(s) with open ports via {}",
        "Discovery".cyan().bold(),
        state.targets,
        state.discovered_hosts,
        state.strategy.as_deref().unwrap_or("n/a")
    );

    let verified = format!("{} host(s), {} port(s)", state.verified_hosts, state.verified_ports);
    if state.verification_degraded {
        println!("{}: {} {}", "Verified".cyan().bold(), verified, "(unverified fallback)".yellow());
    } else {
        println!("{}: {}", "Verified".cyan().bold(), verified);
    }

    if state.failed_hosts > 0 {
        println!("{}: {}", "Host errors".cyan().bold(), state.failed_hosts.to_string().red().bold());
    }
    if state.snapshot_attempts > 0 {
        println!(
            "{}: {}/{} saved",
            "Snapshots".cyan().bold(),
            state.snapshots_saved,
            state.snapshot_attempts
        );
    }

    println!(
        "\n{}",
        format!("Reports written to {} and {}", paths.jsonl.display(), paths.markdown.display()).dimmed()
    );
}

fn print_host(r: &HostAssessment) {
    println!("\n{}", format!("=== {} ===", r.host).bold());
    println!("Open ports: {:?}", r.ports);
    println!("HTTP ports: {:?}", r.http_ports);
    println!("RTSP ports: {:?}", r.rtsp_ports);

    if !r.http.server.is_empty() {
        println!("HTTP Server: {}", r.http.server);
    }
    if !r.login_urls.is_empty() {
        println!("Login pages: {:?}", r.login_urls);
    }
    if r.rtsp.any {
        println!("RTSP Server: {}", r.rtsp.server);
        println!("RTSP Public: {}", r.rtsp.public);
    }

    if !r.vendor.is_empty() {
        if r.note.is_empty() {
            println!("Brand: {}", r.vendor.yellow().bold());
        } else {
            println!("Brand: {} ({})", r.vendor.yellow().bold(), r.note);
        }
        if !r.vulnerabilities.is_empty() {
            println!("Known CVEs: {}", r.vulnerabilities.join(", ").red());
            println!("CVE Links: {}", cvedb::links(&r.vulnerabilities).join(" "));
        }
    }

    if !r.credential.is_empty() {
        println!("{} Default credentials found: {}", "✓".green().bold(), r.credential.red().bold());
    } else if !r.login_urls.is_empty() {
        println!("{} No default credentials found", "✗".dimmed());
    }

    if !r.mjpeg_urls.is_empty() {
        println!("MJPEG streams: {:?}", r.mjpeg_urls);
    }
    if !r.onvif.is_empty() {
        println!("ONVIF: {}", r.onvif);
    }
    if let Some(error) = &r.error {
        println!("{} {}", "error:".red().bold(), error);
    }
}
