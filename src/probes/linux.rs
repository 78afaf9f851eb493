// Linux-specific helpers: /sys/class/net link state and speed, /proc/net/wireless signal level.

/// (interface, is_up) for every entry under /sys/class/net except loopback.
/// `None` when the directory is unreadable or the platform is not Linux.
pub(crate) fn interface_link_states() -> Option<Vec<(String, bool)>> {
    #[cfg(target_os = "linux")]
    {
        let entries = std::fs::read_dir("/sys/class/net").ok()?;
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "lo" {
                continue;
            }
            let state = std::fs::read_to_string(entry.path().join("operstate")).unwrap_or_default();
            out.push((name, operstate_is_up(&state)));
        }
        out.sort();
        Some(out)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// `up` counts as up; `unknown` too, since tun/ppp devices never report anything else.
pub(crate) fn operstate_is_up(state: &str) -> bool {
    matches!(state.trim(), "up" | "unknown")
}

/// Read network interface link speed from /sys/class/net/<interface>/speed (Linux).
/// Returns speed in Mbit/s, or 0 if unavailable.
pub(crate) fn interface_speed_mbps(interface_name: &str) -> u64 {
    #[cfg(target_os = "linux")]
    {
        let path = format!("/sys/class/net/{}/speed", interface_name);
        if let Ok(content) = std::fs::read_to_string(&path)
            && let Ok(mbps) = content.trim().parse::<i64>()
            && mbps > 0
        {
            return mbps as u64;
        }
    }
    #[cfg(not(target_os = "linux"))]
    let _ = interface_name;
    0
}

/// Signal level (dBm) of the first wireless interface in /proc/net/wireless.
pub(crate) fn read_wireless_level_dbm() -> Option<f64> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/net/wireless").ok()?;
        parse_wireless_level(&content)
    }
    #[cfg(not(target_os = "linux"))]
    None
}

/// Parses the `level` column of /proc/net/wireless (two header lines, then one row per device).
pub(crate) fn parse_wireless_level(content: &str) -> Option<f64> {
    for line in content.lines().skip(2) {
        let Some((_iface, rest)) = line.split_once(':') else {
            continue;
        };
        // status, link quality, level, noise, ...
        let level = rest.split_whitespace().nth(2)?;
        let level: f64 = level.trim_end_matches('.').parse().ok()?;
        // Some drivers report an unsigned byte instead of dBm
        let dbm = if level > 0.0 { level - 256.0 } else { level };
        return Some(dbm);
    }
    None
}

/// True if `pid` holds at least one socket, read from /proc/<pid>/fd (Linux).
pub(crate) fn pid_has_socket(pid: u32) -> bool {
    #[cfg(target_os = "linux")]
    {
        let Ok(entries) = std::fs::read_dir(format!("/proc/{}/fd", pid)) else {
            return false;
        };
        entries.flatten().any(|e| {
            std::fs::read_link(e.path())
                .map(|target| target.to_string_lossy().starts_with("socket:"))
                .unwrap_or(false)
        })
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = pid;
        false
    }
}
