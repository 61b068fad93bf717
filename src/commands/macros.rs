/// Declare a trait of instrument commands
///
/// Each entry becomes a method that sends one command through
/// [SerialDevice::send_message](crate::SerialDevice::send_message) and returns the response.
/// Entries without an argument send their command as is. Entries with one argument use the
/// command as a format string for it, and may add `check` with a predicate over `&arg`; a value
/// failing the check returns [Error::Rejected](crate::Error::Rejected) without sending anything.
///
/// The trait is implemented for every [SerialDevice](crate::SerialDevice).
///
/// ```
/// serial_device::device_commands! {
///     /// Commands of a data acquisition board
///     pub trait Board;
///
///     fn identity() = "IDN";
///     fn sample_points() = "POINTS";
///     fn set_rate(hz: u32) = "RATE {}", check |hz: &u32| *hz <= 1000;
/// }
/// ```
#[macro_export]
macro_rules! device_commands {
    {
        $(#[$attr:meta])*
        $vis:vis trait $trait_name:ident;

        $(
            $(#[$f_attr:meta])*
            fn $name:ident($($arg:tt)*) = $command:literal $(, check $check:expr)?;
        )*
    } => {
        $(#[$attr])*
        $vis trait $trait_name: $crate::SerialDevice {
            $(
                $crate::device_command! {
                    $(#[$f_attr])*
                    fn $name($($arg)*) = $command $(, check $check)?;
                }
            )*
        }

        impl<T: $crate::SerialDevice + ?Sized> $trait_name for T {}
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! device_command {
    {
        $(#[$attr:meta])*
        fn $name:ident() = $command:literal;
    } => {
        $(#[$attr])*
        #[doc = concat!("\n\nSends `", $command, "`")]
        fn $name(&mut self) -> $crate::Result<String> {
            self.send_message($command)
        }
    };
    {
        $(#[$attr:meta])*
        fn $name:ident($arg:ident: $arg_type:ty) = $command:literal;
    } => {
        $(#[$attr])*
        #[doc = concat!("\n\nSends `", $command, "`")]
        fn $name(&mut self, $arg: $arg_type) -> $crate::Result<String> {
            self.send_message(&format!($command, $arg))
        }
    };
    {
        $(#[$attr:meta])*
        fn $name:ident($arg:ident: $arg_type:ty) = $command:literal, check $check:expr;
    } => {
        $(#[$attr])*
        #[doc = concat!("\n\nSends `", $command, "` once the value passes its check")]
        fn $name(&mut self, $arg: $arg_type) -> $crate::Result<String> {
            let check = $check;
            if !check(&$arg) {
                return Err($crate::Error::Rejected {
                    command: $command,
                    value: format!("{:?}", $arg),
                });
            }
            self.send_message(&format!($command, $arg))
        }
    };
}
