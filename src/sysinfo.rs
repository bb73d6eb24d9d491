//! What the machine looks like, for display only. Nothing here feeds the
//! installer itself.

use std::{collections::HashMap, fmt, fs, process::Command};

use tracing::debug;

// ── Data types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disk {
    pub path: String,  // /dev/sda
    pub size: String,  // 20G
    pub model: String, // SAMSUNG SSD 870
    pub partitions: Vec<Partition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub path: String,   // /dev/sda1
    pub size: String,   // 512M
    pub fstype: String, // vfat, empty when unformatted
}

impl Disk {
    /// One-line label shown in selectors.
    pub fn display(&self) -> String {
        format!("{:<12}  {:>8}   {}", self.path, self.size, self.model)
    }
}

#[derive(Debug, Clone, Default)]
pub struct System {
    pub cpus: Vec<String>,
    pub memory_kib: Option<u64>,
    pub disks: Vec<Disk>,
    pub interfaces: Vec<String>,
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Your system appears to have the following characteristics:")?;
        for (i, cpu) in self.cpus.iter().enumerate() {
            write!(f, "\nCPU {}: {}", i, cpu)?;
        }
        if let Some(kib) = self.memory_kib {
            write!(f, "\nMemory: {} MiB", kib / 1024)?;
        }
        if !self.disks.is_empty() {
            write!(f, "\nDisks:")?;
            for (i, d) in self.disks.iter().enumerate() {
                write!(f, "\n{}: {}", i, d.display())?;
                for p in &d.partitions {
                    write!(f, "\n    {:<12}  {:>8}   {}", p.path, p.size, p.fstype)?;
                }
            }
        }
        if !self.interfaces.is_empty() {
            write!(f, "\nNetwork: {}", self.interfaces.join(", "))?;
        }
        Ok(())
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Gathers whatever can be found; missing sources leave fields empty.
pub fn discover() -> System {
    let cpus = fs::read_to_string("/proc/cpuinfo")
        .map(|s| parse_cpus(&s))
        .unwrap_or_default();
    let memory_kib = fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|s| parse_mem_total(&s));
    let disks = Command::new("lsblk")
        .args(["--pairs", "--output", "NAME,SIZE,TYPE,MODEL,FSTYPE,PKNAME"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| parse_disks(&String::from_utf8_lossy(&o.stdout)))
        .unwrap_or_else(|| {
            debug!("lsblk unavailable, no disks listed");
            Vec::new()
        });

    let interfaces = fs::read_dir("/sys/class/net")
        .map(|entries| {
            parse_interfaces(
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned()),
            )
        })
        .unwrap_or_default();

    System {
        cpus,
        memory_kib,
        disks,
        interfaces,
    }
}

// ── Parsers ───────────────────────────────────────────────────────────────────

fn parse_cpus(cpuinfo: &str) -> Vec<String> {
    cpuinfo
        .lines()
        .filter_map(|l| l.split_once(':'))
        .filter(|(k, _)| k.trim() == "model name")
        .map(|(_, v)| v.trim().to_string())
        .collect()
}

fn parse_mem_total(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|l| l.strip_prefix("MemTotal:"))
        .and_then(|v| v.split_whitespace().next())
        .and_then(|v| v.parse().ok())
}

// Disks come before their partitions in lsblk output; PKNAME links them.
fn parse_disks(output: &str) -> Vec<Disk> {
    let mut disks: Vec<(String, Disk)> = Vec::new();

    for m in output.lines().map(parse_pairs) {
        let Some(name) = m.get("NAME") else { continue };
        let size = m.get("SIZE").cloned().unwrap_or_default();

        match m.get("TYPE").map(String::as_str) {
            Some("disk") => {
                let model = m.get("MODEL").cloned().unwrap_or_default();
                disks.push((
                    name.clone(),
                    Disk {
                        path: format!("/dev/{}", name),
                        size,
                        model: if model.is_empty() { "—".to_string() } else { model },
                        partitions: Vec::new(),
                    },
                ));
            }
            Some("part") => {
                let parent = m.get("PKNAME").map(String::as_str).unwrap_or_default();
                if let Some((_, disk)) = disks.iter_mut().find(|(n, _)| n == parent) {
                    disk.partitions.push(Partition {
                        path: format!("/dev/{}", name),
                        size,
                        fstype: m.get("FSTYPE").cloned().unwrap_or_default(),
                    });
                }
            }
            _ => {}
        }
    }

    disks.into_iter().map(|(_, d)| d).collect()
}

fn parse_interfaces(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names.filter(|n| n != "lo").collect();
    names.sort();
    names
}

// Each lsblk line looks like:   NAME="sda" SIZE="512M" TYPE="disk" MODEL="QEMU HARDDISK"
fn parse_pairs(line: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut rest = line.trim();

    while let Some(eq) = rest.find('=') {
        let key = rest[..eq].split_whitespace().last().unwrap_or("").to_string();
        let Some(quoted) = rest[eq + 1..].strip_prefix('"') else {
            break;
        };
        let Some(close) = quoted.find('"') else { break };
        if !key.is_empty() {
            map.insert(key, quoted[..close].to_string());
        }
        rest = &quoted[close + 1..];
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lsblk_pairs() {
        let out = "NAME=\"sda\" SIZE=\"20G\" TYPE=\"disk\" MODEL=\"QEMU HARDDISK\"\n\
                   NAME=\"sr0\" SIZE=\"1024M\" TYPE=\"rom\" MODEL=\"\"\n\
                   NAME=\"vdb\" SIZE=\"8G\" TYPE=\"disk\" MODEL=\"\"\n";
        let disks = parse_disks(out);
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0].path, "/dev/sda");
        assert_eq!(disks[0].model, "QEMU HARDDISK");
        assert_eq!(disks[1].model, "—");
    }

    #[test]
    fn partitions_attach_to_their_disk() {
        let out = "NAME=\"sda\" SIZE=\"20G\" TYPE=\"disk\" MODEL=\"QEMU\" FSTYPE=\"\" PKNAME=\"\"\n\
                   NAME=\"sda1\" SIZE=\"512M\" TYPE=\"part\" MODEL=\"\" FSTYPE=\"vfat\" PKNAME=\"sda\"\n\
                   NAME=\"sda2\" SIZE=\"19.5G\" TYPE=\"part\" MODEL=\"\" FSTYPE=\"ext4\" PKNAME=\"sda\"\n\
                   NAME=\"vda\" SIZE=\"8G\" TYPE=\"disk\" MODEL=\"\" FSTYPE=\"\" PKNAME=\"\"\n";
        let disks = parse_disks(out);
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0].partitions.len(), 2);
        assert_eq!(disks[0].partitions[1].path, "/dev/sda2");
        assert_eq!(disks[0].partitions[1].fstype, "ext4");
        assert!(disks[1].partitions.is_empty());

        let system = System {
            disks,
            interfaces: parse_interfaces(
                ["lo", "wlan0", "eth0"].into_iter().map(String::from),
            ),
            ..System::default()
        };
        assert_eq!(system.interfaces, ["eth0", "wlan0"]);
        let shown = system.to_string();
        assert!(shown.contains("\n    /dev/sda1"));
        assert!(shown.ends_with("Network: eth0, wlan0"));
    }

    #[test]
    fn parses_proc_files() {
        let cpuinfo = "processor\t: 0\nmodel name\t: AMD Ryzen 7\n\nprocessor\t: 1\nmodel name\t: AMD Ryzen 7\n";
        assert_eq!(parse_cpus(cpuinfo), ["AMD Ryzen 7", "AMD Ryzen 7"]);
        assert_eq!(parse_mem_total("MemTotal:       16318480 kB\nMemFree: 1 kB\n"), Some(16318480));
        assert_eq!(parse_mem_total("nothing here"), None);
    }
}
