//! Platform affinity calls.
//!
//! On Linux this uses `sched_getaffinity`/`sched_setaffinity`. Writes are
//! applied to every thread listed under `/proc/<pid>/task`, since the
//! syscall only affects the single task it is given.
//!
//! On Windows the process affinity mask is read and written through
//! `GetProcessAffinityMask`/`SetProcessAffinityMask`, which covers the
//! whole process but only the first `usize::BITS` logical processors.

#[cfg(target_os = "linux")]
mod imp {
    use std::fs;
    use std::io;
    use std::mem;

    pub fn get_affinity(pid: u32) -> io::Result<Vec<usize>> {
        let mut cpu_set: libc::cpu_set_t = unsafe { mem::zeroed() };

        let result = unsafe {
            libc::sched_getaffinity(
                pid as libc::pid_t,
                mem::size_of::<libc::cpu_set_t>(),
                &mut cpu_set,
            )
        };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }

        Ok((0..libc::CPU_SETSIZE as usize)
            .filter(|&cpu| unsafe { libc::CPU_ISSET(cpu, &cpu_set) })
            .collect())
    }

    pub fn set_affinity(pid: u32, units: &[usize]) -> io::Result<()> {
        if units.is_empty() {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }

        let mut cpu_set: libc::cpu_set_t = unsafe { mem::zeroed() };
        unsafe { libc::CPU_ZERO(&mut cpu_set) };
        for &cpu in units {
            if cpu >= libc::CPU_SETSIZE as usize {
                return Err(io::Error::from_raw_os_error(libc::EINVAL));
            }
            unsafe { libc::CPU_SET(cpu, &mut cpu_set) };
        }

        // The main thread decides success; it is the process as far as
        // callers are concerned.
        apply(pid, &cpu_set)?;

        for tid in thread_ids(pid) {
            if tid == pid {
                continue;
            }
            if let Err(e) = apply(tid, &cpu_set) {
                // Threads come and go between listing and applying
                if e.raw_os_error() != Some(libc::ESRCH) {
                    log::debug!("Could not set affinity on thread {} of {}: {}", tid, pid, e);
                }
            }
        }

        Ok(())
    }

    fn apply(tid: u32, cpu_set: &libc::cpu_set_t) -> io::Result<()> {
        let result = unsafe {
            libc::sched_setaffinity(
                tid as libc::pid_t,
                mem::size_of::<libc::cpu_set_t>(),
                cpu_set,
            )
        };
        if result == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    fn thread_ids(pid: u32) -> Vec<u32> {
        let Ok(entries) = fs::read_dir(format!("/proc/{}/task", pid)) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect()
    }

}

#[cfg(windows)]
mod imp {
    use std::io;

    use windows_sys::Win32::Foundation::{CloseHandle, ERROR_INVALID_PARAMETER, HANDLE};
    use windows_sys::Win32::System::Threading::{
        GetProcessAffinityMask, OpenProcess, SetProcessAffinityMask,
        PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_SET_INFORMATION,
    };

    /// Process handle closed on drop.
    struct OwnedProcess(HANDLE);

    impl OwnedProcess {
        fn open(pid: u32) -> io::Result<Self> {
            let handle = unsafe {
                OpenProcess(
                    PROCESS_QUERY_LIMITED_INFORMATION | PROCESS_SET_INFORMATION,
                    0,
                    pid,
                )
            };
            if handle.is_null() {
                return Err(io::Error::last_os_error());
            }
            Ok(Self(handle))
        }
    }

    impl Drop for OwnedProcess {
        fn drop(&mut self) {
            unsafe { CloseHandle(self.0) };
        }
    }

    pub fn get_affinity(pid: u32) -> io::Result<Vec<usize>> {
        let process = OwnedProcess::open(pid)?;
        let mut process_mask: usize = 0;
        let mut system_mask: usize = 0;

        let ok = unsafe { GetProcessAffinityMask(process.0, &mut process_mask, &mut system_mask) };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(mask_to_units(process_mask))
    }

    pub fn set_affinity(pid: u32, units: &[usize]) -> io::Result<()> {
        let mask = units_to_mask(units)?;
        let process = OwnedProcess::open(pid)?;

        let ok = unsafe { SetProcessAffinityMask(process.0, mask) };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn mask_to_units(mask: usize) -> Vec<usize> {
        (0..usize::BITS as usize)
            .filter(|&unit| mask & (1 << unit) != 0)
            .collect()
    }

    fn units_to_mask(units: &[usize]) -> io::Result<usize> {
        let invalid = || io::Error::from_raw_os_error(ERROR_INVALID_PARAMETER as i32);
        if units.is_empty() {
            return Err(invalid());
        }
        units.iter().try_fold(0usize, |mask, &unit| {
            if unit >= usize::BITS as usize {
                Err(invalid())
            } else {
                Ok(mask | (1 << unit))
            }
        })
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_mask_round_trips_through_units() {
            assert_eq!(mask_to_units(0b1011), vec![0, 1, 3]);
            assert_eq!(units_to_mask(&[0, 1, 3]).unwrap(), 0b1011);
        }

        #[test]
        fn test_units_to_mask_rejects_empty_and_out_of_range() {
            assert!(units_to_mask(&[]).is_err());
            assert!(units_to_mask(&[usize::BITS as usize]).is_err());
        }

        #[test]
        fn test_get_affinity_of_current_process_is_nonempty() {
            let units = get_affinity(std::process::id()).unwrap();
            assert!(!units.is_empty());
        }
    }
}

#[cfg(not(any(target_os = "linux", windows)))]
mod imp {
    use std::io;

    pub fn get_affinity(_pid: u32) -> io::Result<Vec<usize>> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    pub fn set_affinity(_pid: u32, _units: &[usize]) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }
}

pub use imp::{get_affinity, set_affinity};
