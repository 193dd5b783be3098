/*!

This is the long-form manual for `survey_insights` and `surveyviz`.

## Field kinds

| kind          | raw value            | chart                                   |
|---------------|----------------------|-----------------------------------------|
| `categorical` | one value            | one bucket per option                   |
| `rating`      | one value or number  | one bucket per step of the scale        |
| `multiselect` | list of values       | one bucket per option, fan-out          |
| `free_text`   | text                 | "Provided" / "Empty" counts, neutral    |

Buckets always follow the order of the options in the configuration, and
options without any answer are kept with a count of zero. Charts therefore
do not reshuffle when the filters change.

A value that does not match any option (or a missing value) is not counted.
It is reported in `total_invalid` instead. Values are matched against the
option value first, then case-insensitively against the value and the label.

## Colors

Colors are assigned to labels by the following rules, the first match winning:

1. the overrides provided in the configuration (`colors.overrides`), looked up by
   exact label, lowercase label and then normalized label. Named colors such as
   `teal` are mapped to the hex value of the current theme. Transparent colors
   (`transparent`, `#0000`, `rgba(0, 0, 0, 0)`, ...) are ignored.
2. a small dictionary of labels with a meaning: `yes`, `no`, `high`, `low`,
   `n/a`, ...
3. gray, for free-text fields.
4. a palette slot chosen from a hash of the label and of the field id.

The palette slot of a label is the same for the light and the dark theme, only
the color of the slot changes.

## Input formats

### `json`

```text
[
  { "id": "r1", "submittedAt": "2024-05-01T10:00:00Z",
    "values": { "team": "Platform", "tools": ["Rust", "Go"], "score": 4 } }
]
```

### `csv`

The first row holds the field ids. The identifier and the submission time
columns are set with `idColumnIndex` and `submittedAtColumnIndex` (starting at 1).
Multiselect cells are split on `multiselectDelimiter` (`;` by default).

```text
id,submitted,team,tools,score
r1,2024-05-01T10:00:00Z,Platform,Rust;Go,4
```

### `msforms`

The Excel export of Microsoft Forms or Google Forms. The columns are matched to
the fields by their header. The `Completion time` (or `Timestamp`) column provides
the submission time.

## Configuration

`surveyviz` reads a JSON configuration file:

```text
{
  "outputSettings": { "surveyName": "Team pulse", "darkMode": false },
  "schema": [
    { "id": "team", "type": "categorical", "order": 1, "section": "about",
      "options": [ { "value": "platform", "label": "Platform" } ] }
  ],
  "responseSources": [ { "provider": "csv", "filePath": "responses.csv" } ],
  "filters": { "from": "2024-05-01", "to": "2024-05-31", "section": "all" },
  "colors": { "overrides": { "Platform": "teal" } }
}
```

The paths of the sources are relative to the configuration file. Options given
on the command line take precedence over the configuration.

 */
