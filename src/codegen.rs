//! Dart codegen for lowered classes.
//!
//! One unit per class: field declarations, a named-parameter constructor,
//! `fromJson` / `toJson`, and optionally `copyWith`. Output depends only on
//! the class table and the config, so it is byte-stable across runs.
use crate::config::Config;
use crate::ir::{ClassDescriptor, FieldDescriptor, Primitive, Slot, TypeDescriptor};
use crate::lower::Lowered;
use crate::naming::dart_string_literal;

const JSON_MAP: &str = "Map<String, dynamic>";

pub struct Codegen<'a> {
    config: &'a Config,
    classes: &'a Lowered,
    indent: String,
    out: String,
}

impl<'a> Codegen<'a> {
    pub fn new(config: &'a Config, classes: &'a Lowered) -> Self {
        Self {
            config,
            classes,
            indent: " ".repeat(config.indent),
            out: String::new(),
        }
    }

    pub fn into_string(self) -> String { self.out }

    fn line(&mut self, level: usize, text: &str) {
        if !text.is_empty() {
            for _ in 0..level {
                self.out.push_str(&self.indent);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    // ---------------------------- type syntax ---------------------------- //

    fn type_name(&self, ty: &TypeDescriptor) -> String {
        match ty {
            TypeDescriptor::Primitive(p) => match p {
                Primitive::Bool => "bool".to_string(),
                Primitive::Int => "int".to_string(),
                Primitive::Double => "double".to_string(),
                Primitive::String => "String".to_string(),
                Primitive::Null | Primitive::Dynamic => self.config.null_type_name().to_string(),
            },
            TypeDescriptor::List(item) => format!("List<{}>", self.slot_type(item)),
            TypeDescriptor::Class(id) => self.classes.name_of(*id).to_string(),
        }
    }

    /// Type with the `?` marker when null safety is on and the slot is nullable.
    pub fn slot_type(&self, slot: &Slot) -> String {
        self.optional(self.type_name(&slot.ty), slot.nullable)
    }

    fn optional(&self, base: String, nullable: bool) -> String {
        if self.config.null_safety && nullable && !already_nullable(&base) {
            base + "?"
        } else {
            base
        }
    }

    // null may show up at runtime
    fn maybe_null(&self, slot: &Slot) -> bool {
        slot.nullable || !self.config.null_safety
    }

    // --------------------------- fromJson exprs --------------------------- //

    fn read(&self, src: &str, slot: &Slot, depth: usize) -> String {
        let maybe_null = self.maybe_null(slot);
        let q = if self.config.null_safety && slot.nullable { "?" } else { "" };
        match &slot.ty {
            TypeDescriptor::Primitive(Primitive::Null | Primitive::Dynamic) => {
                // only `dynamic` takes an untyped value without a cast
                let name = self.config.null_type_name();
                if name == "dynamic" {
                    src.to_string()
                } else {
                    format!("{src} as {}", self.optional(name.to_string(), slot.nullable))
                }
            }
            TypeDescriptor::Primitive(Primitive::Double) => {
                if maybe_null {
                    format!("({src} as num{q})?.toDouble()")
                } else {
                    format!("({src} as num).toDouble()")
                }
            }
            TypeDescriptor::Primitive(_) => format!("{src} as {}{q}", self.type_name(&slot.ty)),
            TypeDescriptor::Class(id) => {
                let name = self.classes.name_of(*id);
                if maybe_null {
                    format!("{src} == null ? null : {name}.fromJson({src} as {JSON_MAP})")
                } else {
                    format!("{name}.fromJson({src} as {JSON_MAP})")
                }
            }
            TypeDescriptor::List(item) => {
                let var = lambda_var(depth);
                let elem = self.read(&var, item, depth + 1);
                if !maybe_null {
                    format!("({src} as List<dynamic>).map(({var}) => {elem}).toList()")
                } else if self.config.null_safety {
                    format!("({src} as List<dynamic>?)?.map(({var}) => {elem}).toList()")
                } else {
                    format!("({src} as List<dynamic>)?.map(({var}) => {elem})?.toList()")
                }
            }
        }
    }

    // ---------------------------- toJson exprs ---------------------------- //

    /// `None` when the value can be stored as-is.
    fn write(&self, src: &str, slot: &Slot, depth: usize) -> Option<String> {
        let maybe_null = self.maybe_null(slot);
        match &slot.ty {
            TypeDescriptor::Primitive(_) => None,
            TypeDescriptor::Class(_) => Some(if maybe_null {
                format!("{src}?.toJson()")
            } else {
                format!("{src}.toJson()")
            }),
            TypeDescriptor::List(item) => {
                let var = lambda_var(depth);
                let elem = self.write(&var, item, depth + 1)?;
                Some(if !maybe_null {
                    format!("{src}.map(({var}) => {elem}).toList()")
                } else if self.config.null_safety {
                    format!("{src}?.map(({var}) => {elem}).toList()")
                } else {
                    format!("{src}?.map(({var}) => {elem})?.toList()")
                })
            }
        }
    }

    // ------------------------------- class -------------------------------- //

    pub fn emit(&mut self, class: &ClassDescriptor) {
        let name = class.name.as_str();
        self.line(0, &format!("class {name} {{"));

        for f in &class.fields {
            let decl = format!("final {} {};", self.slot_type(&f.slot()), f.name);
            self.line(1, &decl);
        }
        if !class.fields.is_empty() {
            self.line(0, "");
        }

        self.emit_constructor(class);
        self.line(0, "");
        self.emit_from_json(class);
        self.line(0, "");
        self.emit_to_json(class);
        if self.config.copy_with {
            self.line(0, "");
            self.emit_copy_with(class);
        }

        self.line(0, "}");
    }

    fn emit_constructor(&mut self, class: &ClassDescriptor) {
        if class.fields.is_empty() {
            self.line(1, &format!("{}();", class.name));
            return;
        }
        self.line(1, &format!("{}({{", class.name));
        for f in &class.fields {
            let param = if self.is_required(f) {
                format!("required this.{},", f.name)
            } else {
                format!("this.{},", f.name)
            };
            self.line(2, &param);
        }
        self.line(1, "});");
    }

    fn is_required(&self, f: &FieldDescriptor) -> bool {
        self.config.null_safety && !f.nullable
    }

    fn emit_from_json(&mut self, class: &ClassDescriptor) {
        let name = class.name.as_str();
        self.line(1, &format!("factory {name}.fromJson({JSON_MAP} json) {{"));
        if class.fields.is_empty() {
            self.line(2, &format!("return {name}();"));
        } else {
            self.line(2, &format!("return {name}("));
            for f in &class.fields {
                let src = format!("json[{}]", dart_string_literal(&f.json_key));
                let arg = format!("{}: {},", f.name, self.read(&src, &f.slot(), 0));
                self.line(3, &arg);
            }
            self.line(2, ");");
        }
        self.line(1, "}");
    }

    fn emit_to_json(&mut self, class: &ClassDescriptor) {
        self.line(1, &format!("{JSON_MAP} toJson() {{"));
        if class.fields.is_empty() {
            self.line(2, "return <String, dynamic>{};");
        } else {
            self.line(2, "return <String, dynamic>{");
            for f in &class.fields {
                let value = self.write(&f.name, &f.slot(), 0).unwrap_or_else(|| f.name.clone());
                let entry = format!("{}: {value},", dart_string_literal(&f.json_key));
                self.line(3, &entry);
            }
            self.line(2, "};");
        }
        self.line(1, "}");
    }

    fn emit_copy_with(&mut self, class: &ClassDescriptor) {
        let name = class.name.as_str();
        if class.fields.is_empty() {
            self.line(1, &format!("{name} copyWith() {{"));
            self.line(2, &format!("return {name}();"));
            self.line(1, "}");
            return;
        }
        self.line(1, &format!("{name} copyWith({{"));
        for f in &class.fields {
            // every override is optional
            let param = format!("{} {},", self.optional(self.type_name(&f.ty), true), f.name);
            self.line(2, &param);
        }
        self.line(1, "}) {");
        self.line(2, &format!("return {name}("));
        for f in &class.fields {
            self.line(3, &format!("{0}: {0} ?? this.{0},", f.name));
        }
        self.line(2, ");");
        self.line(1, "}");
    }
}

fn lambda_var(depth: usize) -> String {
    if depth == 0 { "e".to_string() } else { format!("e{depth}") }
}

fn already_nullable(ty: &str) -> bool {
    ty == "dynamic" || ty == "Null" || ty.ends_with('?')
}

/// Render one class as a standalone Dart unit.
pub fn emit_class(config: &Config, classes: &Lowered, class: &ClassDescriptor) -> String {
    let mut cg = Codegen::new(config, classes);
    cg.emit(class);
    cg.into_string()
}
