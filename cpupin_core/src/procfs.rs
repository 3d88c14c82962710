//! Reading task state from the process-information filesystem.
//!
//! The monitor needs one thing per thread: the core it last ran on, which the
//! kernel exposes as the `processor` field of `/proc/<pid>/task/<tid>/stat`.
//! The stat line is awkward to split because the command name may contain
//! spaces and parentheses; the name is delimited by the first `(` and the
//! *last* `)`, and all field counting starts after that.

use std::fs;

use crate::error::{PinError, PinResult};

pub type Pid = libc::pid_t;
pub type Tid = libc::pid_t;

/// `state` is field 3 of the stat line and `processor` field 39; after
/// consuming state and ppid, the processor is this many fields further on.
const PROCESSOR_SKIP: usize = 34;

/// Parsed fields of a stat line, limited to what the tools consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStat {
    pub pid: Pid,
    /// Command name, without the surrounding parentheses.
    pub name: String,
    /// Single-character state code (`R`, `S`, `D`, ...).
    pub state: char,
    pub ppid: Pid,
    /// CPU the task last ran on.
    pub last_cpu: usize,
}

impl TaskStat {
    pub fn parse(raw: &str) -> PinResult<Self> {
        let open = raw.find('(').ok_or_else(|| malformed(raw))?;
        let close = raw.rfind(')').ok_or_else(|| malformed(raw))?;
        if close < open {
            return Err(malformed(raw));
        }

        let pid = raw[..open]
            .trim()
            .parse::<Pid>()
            .map_err(|_| malformed(raw))?;
        let name = raw[open + 1..close].to_owned();

        let mut fields = raw[close + 1..].split_whitespace();
        let state = fields
            .next()
            .and_then(|field| field.chars().next())
            .ok_or_else(|| malformed(raw))?;
        let ppid = fields
            .next()
            .and_then(|field| field.parse::<Pid>().ok())
            .ok_or_else(|| malformed(raw))?;
        let last_cpu = fields
            .nth(PROCESSOR_SKIP)
            .and_then(|field| field.parse::<usize>().ok())
            .ok_or_else(|| malformed(raw))?;

        Ok(Self {
            pid,
            name,
            state,
            ppid,
            last_cpu,
        })
    }
}

fn malformed(raw: &str) -> PinError {
    PinError::parse(format!("malformed stat content: '{}'", raw.trim_end()))
}

/// Stat of a whole process (its main thread).
pub fn process_stat(pid: Pid) -> PinResult<TaskStat> {
    stat_at(&format!("/proc/{pid}/stat"))
}

/// Stat of a single thread of a process.
pub fn task_stat(pid: Pid, tid: Tid) -> PinResult<TaskStat> {
    stat_at(&format!("/proc/{pid}/task/{tid}/stat"))
}

fn stat_at(path: &str) -> PinResult<TaskStat> {
    TaskStat::parse(&fs::read_to_string(path)?)
}

/// Thread ids of a process, ascending. Fails when the process is gone.
pub fn thread_ids(pid: Pid) -> PinResult<Vec<Tid>> {
    numeric_entries(&format!("/proc/{pid}/task"))
}

/// All process ids currently visible, ascending.
pub fn process_ids() -> PinResult<Vec<Pid>> {
    numeric_entries("/proc")
}

fn numeric_entries(dir: &str) -> PinResult<Vec<Pid>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(id) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<Pid>().ok())
        {
            ids.push(id);
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A stat line with `name` spliced in, ppid 42, processor 7.
    fn stat_line(name: &str) -> String {
        let mut line = format!("1234 ({name}) S 42");
        for _ in 0..PROCESSOR_SKIP {
            line.push_str(" 0");
        }
        line.push_str(" 7 0 0 0 0\n");
        line
    }

    #[test]
    fn parses_the_interesting_fields() {
        let stat = TaskStat::parse(&stat_line("cat")).unwrap();
        assert_eq!(stat.pid, 1234);
        assert_eq!(stat.name, "cat");
        assert_eq!(stat.state, 'S');
        assert_eq!(stat.ppid, 42);
        assert_eq!(stat.last_cpu, 7);
    }

    #[test]
    fn name_may_contain_spaces_and_parentheses() {
        let stat = TaskStat::parse(&stat_line("tmux: server (1)")).unwrap();
        assert_eq!(stat.name, "tmux: server (1)");
        assert_eq!(stat.last_cpu, 7);
    }

    #[test]
    fn truncated_or_garbled_lines_are_rejected() {
        assert!(TaskStat::parse("").is_err());
        assert!(TaskStat::parse("1234").is_err());
        assert!(TaskStat::parse("1234 (cat").is_err());
        assert!(TaskStat::parse("1234 (cat) S").is_err());
        assert!(TaskStat::parse("x (cat) S 42").is_err());
        // Long enough, but the processor field is not numeric.
        let mut line = String::from("1 (a) R 0");
        for _ in 0..PROCESSOR_SKIP {
            line.push_str(" 0");
        }
        line.push_str(" seven");
        assert!(TaskStat::parse(&line).is_err());
    }

    #[test]
    fn reads_the_current_process() {
        let pid = std::process::id() as Pid;
        let stat = process_stat(pid).unwrap();
        assert_eq!(stat.pid, pid);
        assert!(!stat.name.is_empty());
    }

    #[test]
    fn current_process_lists_its_own_threads() {
        let pid = std::process::id() as Pid;
        let tids = thread_ids(pid).unwrap();
        assert!(tids.contains(&pid));
        // Sibling test threads may exit between the scan and the read; only
        // judge the ones that could still be read.
        for tid in tids {
            if let Ok(stat) = task_stat(pid, tid) {
                assert_eq!(stat.pid, tid);
            }
        }
    }

    #[test]
    fn process_listing_contains_ourselves() {
        let pid = std::process::id() as Pid;
        assert!(process_ids().unwrap().contains(&pid));
    }
}
