//! End-to-end checks that drive the real SSH prober against loopback
//! sockets and an in-process SSH server. Nothing here needs network access
//! beyond 127.0.0.0/8.

#[cfg(test)]
mod server;

#[cfg(test)]
mod util;

#[cfg(test)]
mod probe {
    mod integration;
}

#[cfg(test)]
mod scan {
    mod integration;
}
