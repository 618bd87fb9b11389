//! Macros for declaring closed state and event vocabularies.

/// Generate a state enum and its `State` implementation.
///
/// Every variant carries its persisted name. The generated type also gets
/// `ALL`, `INITIAL` and `from_name` so tables and decoders can enumerate
/// and look up the vocabulary.
///
/// # Example
///
/// ```
/// use auditflow::core::State;
/// use auditflow::state_enum;
///
/// state_enum! {
///     pub enum UploadState {
///         Waiting = "WAITING",
///         Uploaded = "UPLOADED",
///         Closed = "CLOSED",
///     }
///     initial: Waiting
///     final: [Closed]
/// }
///
/// assert_eq!(UploadState::INITIAL, UploadState::Waiting);
/// assert_eq!(UploadState::from_name("UPLOADED"), Some(UploadState::Uploaded));
/// assert!(UploadState::Closed.is_final());
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $label:literal
            ),* $(,)?
        }

        initial: $initial:ident
        $(final: [$($final:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug,
            serde::Serialize, serde::Deserialize,
        )]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $label)]
                $variant
            ),*
        }

        impl $name {
            /// Every state of this actor kind, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant),*];

            /// The state every new machine instance starts in.
            pub const INITIAL: $name = Self::$initial;

            /// Look up a state by its persisted name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($label => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),*
                }
            }

            #[allow(unreachable_patterns)]
            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    _ => false,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::core::State::name(self))
            }
        }
    };
}

/// Generate an event enum and its `Event` implementation.
///
/// # Example
///
/// ```
/// use auditflow::core::Event;
/// use auditflow::event_enum;
///
/// event_enum! {
///     pub enum UploadEvent {
///         Upload = "UPLOAD_EVENT",
///         Close = "CLOSE_EVENT",
///     }
/// }
///
/// assert_eq!(UploadEvent::Upload.name(), "UPLOAD_EVENT");
/// assert_eq!(UploadEvent::ALL.len(), 2);
/// ```
#[macro_export]
macro_rules! event_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $label:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug,
            serde::Serialize, serde::Deserialize,
        )]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $label)]
                $variant
            ),*
        }

        impl $name {
            /// Every event of this actor kind, in declaration order.
            pub const ALL: &'static [$name] = &[$(Self::$variant),*];

            /// Look up an event by its persisted name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($label => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }

        impl $crate::core::Event for $name {
            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::core::Event::name(self))
            }
        }
    };
}
